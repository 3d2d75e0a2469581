//! Font catalog: wire format, listing sources and the on-disk blob cache.
//!
//! A refresh tries the network once. A good response is written back to
//! `fonts_cache.json` and returned; any failure falls back to the last blob
//! that was written, and when that is missing or unreadable the caller gets
//! an empty catalog. Nothing escapes [`CatalogCache::fetch`] as an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use fontmgr_types::{FontRecord, FontSourceType};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::fetcher::Fetcher;

pub const GOOGLE_FONTS_API_URL: &str = "https://www.googleapis.com/webfonts/v1/webfonts";
pub const DEFAULT_MIRROR_URL: &str = "https://raw.githubusercontent.com/routersys/YMM4-FontManager/main/font_list/google_fonts_data/all_fonts.json";

/// File name of the persisted catalog blob.
pub const CATALOG_BLOB_FILE: &str = "fonts_cache.json";

const GOOGLE_AUTHOR: &str = "Google Fonts";
const GOOGLE_LICENSE: &str = "OFL";

/// Top-level listing document: `{"items": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subsets: Vec<String>,
    /// Style name -> URL, in document order.
    #[serde(default)]
    pub files: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub version: String,
}

impl CatalogItem {
    /// `regular` when present, otherwise the first URL listed.
    pub fn primary_url(&self) -> Option<&str> {
        self.files
            .get("regular")
            .and_then(|v| v.as_str())
            .or_else(|| self.files.values().find_map(|v| v.as_str()))
    }

    pub fn to_record(&self) -> FontRecord {
        let mut tags = Vec::with_capacity(self.subsets.len() + 1);
        tags.push(self.category.clone());
        tags.extend(self.subsets.iter().cloned());

        FontRecord {
            family: self.family.clone(),
            author: GOOGLE_AUTHOR.to_owned(),
            license: GOOGLE_LICENSE.to_owned(),
            description: self.category.clone(),
            download_url: self.primary_url().unwrap_or_default().to_owned(),
            tags,
            subsets: self.subsets.clone(),
            source_type: FontSourceType::GoogleFonts,
        }
    }
}

impl CatalogResponse {
    pub fn records(&self) -> Vec<FontRecord> {
        self.items
            .iter()
            .filter(|item| !item.family.trim().is_empty())
            .map(CatalogItem::to_record)
            .collect()
    }
}

/// Where the font listing is downloaded from.
#[derive(Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// The Google Fonts developer API, sorted by popularity.
    GoogleApi { api_key: String },
    /// A pre-generated listing in the same format (no key needed).
    Mirror { url: String },
}

impl std::fmt::Debug for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogSource::GoogleApi { .. } => f.debug_struct("GoogleApi").finish_non_exhaustive(),
            CatalogSource::Mirror { url } => f.debug_struct("Mirror").field("url", url).finish(),
        }
    }
}

impl CatalogSource {
    pub fn mirror() -> Self {
        CatalogSource::Mirror {
            url: DEFAULT_MIRROR_URL.to_owned(),
        }
    }

    /// The API is used only when asked for and a non-blank key is configured.
    pub fn from_settings(api_key: Option<&str>, use_api_directly: bool) -> Self {
        match api_key.map(str::trim) {
            Some(key) if use_api_directly && !key.is_empty() => CatalogSource::GoogleApi {
                api_key: key.to_owned(),
            },
            _ => Self::mirror(),
        }
    }

    pub fn url(&self) -> String {
        match self {
            CatalogSource::GoogleApi { api_key } => {
                format!("{GOOGLE_FONTS_API_URL}?key={api_key}&sort=popularity")
            }
            CatalogSource::Mirror { url } => url.clone(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CatalogSource::GoogleApi { .. } => "google_api",
            CatalogSource::Mirror { .. } => "mirror",
        }
    }
}

/// Network-first catalog fetch with a persisted stale fallback.
pub struct CatalogCache {
    fetcher: Arc<dyn Fetcher>,
    blob_path: PathBuf,
    /// Serializes blob reads and writes within the process.
    file_lock: Mutex<()>,
}

impl CatalogCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, blob_path: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            blob_path: blob_path.into(),
            file_lock: Mutex::new(()),
        }
    }

    /// Cache whose blob lives at `<dir>/fonts_cache.json`.
    pub fn in_dir(fetcher: Arc<dyn Fetcher>, dir: impl AsRef<Path>) -> Self {
        Self::new(fetcher, dir.as_ref().join(CATALOG_BLOB_FILE))
    }

    pub fn blob_path(&self) -> &Path {
        &self.blob_path
    }

    /// One refresh attempt. Never fails; see the module docs for the order.
    pub async fn fetch(&self, source: &CatalogSource) -> Vec<FontRecord> {
        match self.fetch_remote(source).await {
            Ok((response, raw)) => {
                if let Err(e) = self.persist(&raw).await {
                    warn!(path = %self.blob_path.display(), error = %e, "failed to persist catalog blob");
                }
                let records = response.records();
                info!(source = source.kind(), count = records.len(), "catalog fetched");
                records
            }
            Err(e) => {
                warn!(source = source.kind(), error = %e, "catalog fetch failed; using cached copy");
                match self.load().await {
                    Some(response) => response.records(),
                    None => Vec::new(),
                }
            }
        }
    }

    async fn fetch_remote(
        &self,
        source: &CatalogSource,
    ) -> Result<(CatalogResponse, Bytes), FetchError> {
        let raw = self.fetcher.get_bytes(&source.url()).await?;
        let response: CatalogResponse = serde_json::from_slice(&raw)?;
        Ok((response, raw))
    }

    /// Replace the blob atomically (temp file + rename).
    pub async fn persist(&self, raw: &[u8]) -> Result<(), FetchError> {
        let _guard = self.file_lock.lock().await;
        if let Some(dir) = self.blob_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self
            .blob_path
            .with_extension(format!("{}.part", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, raw).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.blob_path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(path = %self.blob_path.display(), bytes = raw.len(), "catalog blob written");
        Ok(())
    }

    /// Last persisted catalog; missing and corrupt blobs both yield `None`.
    pub async fn load(&self) -> Option<CatalogResponse> {
        let _guard = self.file_lock.lock().await;
        let raw = match tokio::fs::read(&self.blob_path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.blob_path.display(), error = %e, "no catalog blob");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(path = %self.blob_path.display(), error = %e, "catalog blob is corrupt; ignoring");
                None
            }
        }
    }
}
