//! Command surface for a presentation layer.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use fontmgr_fetch::{CatalogCache, CatalogSource, DownloadGate, Fetcher, HttpFetcher};
use fontmgr_registrar::{FontRegistrar, default_registrar, registrar::contains_family};
use fontmgr_types::{FontRecord, InstallStatus};
use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::TieredFontCache;
use crate::config::Config;
use crate::error::CoreError;
use crate::events::{EventBus, FontEvent};
use crate::favorites::{FavoriteStore, JsonFavoriteStore};
use crate::item::{FontItem, FontServices};

/// Builder for [`FontManager`]. Unset collaborators get platform defaults.
pub struct FontManagerBuilder {
    config: Config,
    fetcher: Option<Arc<dyn Fetcher>>,
    registrar: Option<Arc<dyn FontRegistrar>>,
    favorites: Option<Arc<dyn FavoriteStore>>,
}

impl FontManagerBuilder {
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn registrar(mut self, registrar: Arc<dyn FontRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn favorites(mut self, favorites: Arc<dyn FavoriteStore>) -> Self {
        self.favorites = Some(favorites);
        self
    }

    pub fn build(self) -> FontManager {
        let config = self.config;
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::new()));
        let registrar = self
            .registrar
            .unwrap_or_else(|| Arc::new(default_registrar(&config.data_dir)));
        let favorites = self
            .favorites
            .unwrap_or_else(|| Arc::new(JsonFavoriteStore::open(config.favorites_path())));

        let services = Arc::new(FontServices {
            fetcher: Arc::clone(&fetcher),
            gate: DownloadGate::new(config.download_concurrency),
            cache: TieredFontCache::from_config(&config),
            registrar,
            favorites,
            events: EventBus::new(),
        });
        let catalog = CatalogCache::in_dir(fetcher, config.cache_dir());

        FontManager {
            config,
            services,
            catalog,
            items: RwLock::new(Vec::new()),
        }
    }
}

/// Owns the catalog, the shared collaborators and one [`FontItem`] per font.
pub struct FontManager {
    config: Config,
    services: Arc<FontServices>,
    catalog: CatalogCache,
    items: RwLock<Vec<Arc<FontItem>>>,
}

impl FontManager {
    pub fn builder(config: Config) -> FontManagerBuilder {
        FontManagerBuilder {
            config,
            fetcher: None,
            registrar: None,
            favorites: None,
        }
    }

    pub fn new(config: Config) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn gate(&self) -> &DownloadGate {
        &self.services.gate
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FontEvent> {
        self.services.events.subscribe()
    }

    pub fn items(&self) -> Vec<Arc<FontItem>> {
        self.items
            .read()
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    /// Case-insensitive lookup by family.
    pub fn item(&self, family: &str) -> Option<Arc<FontItem>> {
        self.items.read().ok().and_then(|items| {
            items
                .iter()
                .find(|item| item.record().matches_family(family))
                .cloned()
        })
    }

    fn require(&self, family: &str) -> Result<Arc<FontItem>, CoreError> {
        self.item(family)
            .ok_or_else(|| CoreError::NotFound(family.to_owned()))
    }

    /// Refresh from the source selected by [`Config::catalog_source`].
    pub async fn refresh(&self) -> usize {
        let source = self.config.catalog_source();
        self.refresh_catalog(&source).await
    }

    /// Fetch the catalog (with stale fallback) and rebuild the font items.
    pub async fn refresh_catalog(&self, source: &CatalogSource) -> usize {
        let records = self.catalog.fetch(source).await;
        self.load_records(records).await
    }

    /// Replace the font items with `records`, marking installed fonts.
    pub async fn load_records(&self, records: Vec<FontRecord>) -> usize {
        let services = Arc::clone(&self.services);
        // Registry reads block.
        let built = tokio::task::spawn_blocking(move || build_items(records, services)).await;
        let mut items = match built {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "building font items failed");
                return self.items.read().map(|items| items.len()).unwrap_or(0);
            }
        };

        let count = items.len();
        if let Ok(mut current) = self.items.write() {
            // An install still downloading keeps its item so its result stays visible.
            for item in items.iter_mut() {
                if let Some(busy) = current
                    .iter()
                    .find(|old| old.status().is_busy() && old.record().matches_family(item.family()))
                {
                    *item = Arc::clone(busy);
                }
            }
            *current = items;
        }
        info!(count, "catalog loaded");
        self.services
            .events
            .publish(FontEvent::CatalogRefreshed { count });
        count
    }

    pub async fn install(&self, family: &str) -> Result<InstallStatus, CoreError> {
        Ok(self.require(family)?.install().await)
    }

    /// Refused for fonts registered outside the user font directory.
    pub async fn uninstall(&self, family: &str) -> Result<InstallStatus, CoreError> {
        let item = self.require(family)?;
        if !item.can_uninstall() {
            debug!(family, status = %item.status(), "uninstall not permitted");
            return Ok(item.status());
        }
        Ok(item.uninstall().await)
    }

    /// Returns the new favorite flag.
    pub fn toggle_favorite(&self, family: &str) -> Result<bool, CoreError> {
        Ok(self.require(family)?.toggle_favorite())
    }

    /// Resolve previews for every font; downloads are bounded by the gate.
    ///
    /// Returns how many fonts have a preview afterwards.
    pub async fn ensure_previews(&self) -> usize {
        let items = self.items();
        let resolved = join_all(items.iter().map(|item| item.resolve_preview())).await;
        resolved.into_iter().flatten().count()
    }
}

fn build_items(records: Vec<FontRecord>, services: Arc<FontServices>) -> Vec<Arc<FontItem>> {
    let installed = services.registrar.enumerate_installed();
    let mut seen = HashSet::new();

    records
        .into_iter()
        .filter(|record| seen.insert(record.family.to_lowercase()))
        .map(|record| {
            let is_installed = contains_family(&installed, &record.family);
            Arc::new(FontItem::new(record, Arc::clone(&services), is_installed))
        })
        .collect()
}
