use std::collections::HashMap;
use std::env;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Source of raw bytes for catalog listings and font binaries.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
///
/// Proxy is read from `HTTP_PROXY` / `HTTPS_PROXY` when present. No retry and
/// no timeout beyond the transport defaults.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let proxy = env::var("HTTP_PROXY")
            .ok()
            .or_else(|| env::var("HTTPS_PROXY").ok());
        Self::with_proxy(proxy.as_deref())
    }

    pub fn with_proxy(proxy: Option<&str>) -> Self {
        let mut builder =
            Client::builder().user_agent(concat!("fontmgr/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy_url) = proxy {
            match reqwest::Proxy::all(proxy_url) {
                Ok(p) => {
                    builder = builder.proxy(p);
                }
                Err(e) => {
                    warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy URL");
                }
            }
        }

        let client = builder.build().unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        debug!(%url, "GET");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(resp.bytes().await?)
    }
}

/// In-memory [`Fetcher`] serving a fixed `url -> bytes` map.
///
/// Counts every request and tracks the peak number of requests in flight, so
/// callers can observe how much concurrency reached the "network".
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    resources: RwLock<HashMap<String, Bytes>>,
    latency: Option<Duration>,
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, keeping the request "in flight" meanwhile.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_resource(self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        if let Ok(mut map) = self.resources.write() {
            map.insert(url.into(), body.into());
        }
    }

    pub fn remove(&self, url: &str) {
        if let Ok(mut map) = self.resources.write() {
            map.remove(url);
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let body = self
            .resources
            .read()
            .ok()
            .and_then(|map| map.get(url).cloned());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        body.ok_or_else(|| FetchError::NotFound(url.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_fetcher_serves_registered_urls() {
        let fetcher = MemoryFetcher::new().with_resource("https://example/a.ttf", &b"abc"[..]);

        let body = fetcher.get_bytes("https://example/a.ttf").await.unwrap();
        assert_eq!(&body[..], b"abc");

        let err = fetcher.get_bytes("https://example/missing.ttf").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert_eq!(fetcher.request_count(), 2);
        assert_eq!(fetcher.peak_in_flight(), 1);
    }

    #[test]
    fn http_fetcher_tolerates_bad_proxy() {
        // Falls back to a direct client instead of failing construction.
        let _fetcher = HttpFetcher::with_proxy(Some("::not a url::"));
    }
}
