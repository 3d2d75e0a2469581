//! Per-font acquisition state machine.
//!
//! ```text
//! NotInstalled ──install──▶ Downloading ──▶ Installed ──uninstall──▶ NotInstalled
//!      ▲                        │
//!      └──── Error ◀────────────┘   (Error accepts a new install)
//! ```
//!
//! Preview resolution and install share one acquisition path: resolve from
//! the tiered cache, otherwise take the per-font flight lock and a download
//! gate slot, re-check the cache, fetch and store. Holding the flight lock
//! means a preview and an install of the same font never download twice.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fontmgr_fetch::{DownloadGate, FetchError, Fetcher};
use fontmgr_registrar::FontRegistrar;
use fontmgr_types::{FontRecord, InstallStatus, Locale};
use tracing::{debug, info, warn};

use crate::cache::TieredFontCache;
use crate::error::CoreError;
use crate::events::{EventBus, FontEvent};
use crate::favorites::FavoriteStore;

/// Collaborators shared by every [`FontItem`].
pub struct FontServices {
    pub fetcher: Arc<dyn Fetcher>,
    pub gate: DownloadGate,
    pub cache: TieredFontCache,
    pub registrar: Arc<dyn FontRegistrar>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub events: EventBus,
}

/// Locally resolved font binary a UI can render a preview from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    path: PathBuf,
}

impl PreviewHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug)]
struct ItemState {
    status: InstallStatus,
    favorite: bool,
    uninstallable: bool,
    preview: Option<PreviewHandle>,
}

/// One catalog font and its observable install state.
pub struct FontItem {
    record: FontRecord,
    services: Arc<FontServices>,
    state: Mutex<ItemState>,
    /// Single-flight guard around download + store.
    flight: tokio::sync::Mutex<()>,
    /// Serializes uninstall attempts.
    unregister: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for FontItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontItem")
            .field("family", &self.record.family)
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl FontItem {
    /// `installed` comes from the registrar's installed-name enumeration.
    pub fn new(record: FontRecord, services: Arc<FontServices>, installed: bool) -> Self {
        let favorite = services.favorites.is_favorite(&record.family);
        let uninstallable = installed && services.registrar.is_uninstallable(&record.family);
        let status = if installed {
            InstallStatus::Installed
        } else {
            InstallStatus::NotInstalled
        };

        Self {
            record,
            services,
            state: Mutex::new(ItemState {
                status,
                favorite,
                uninstallable,
                preview: None,
            }),
            flight: tokio::sync::Mutex::new(()),
            unregister: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ItemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self) -> &FontRecord {
        &self.record
    }

    pub fn family(&self) -> &str {
        &self.record.family
    }

    pub fn status(&self) -> InstallStatus {
        self.state().status
    }

    pub fn display_status(&self, locale: Locale) -> &'static str {
        self.status().label(locale)
    }

    pub fn is_favorite(&self) -> bool {
        self.state().favorite
    }

    /// Backing file lives in the user font directory.
    pub fn is_uninstallable(&self) -> bool {
        self.state().uninstallable
    }

    /// Enablement of the uninstall command.
    pub fn can_uninstall(&self) -> bool {
        let st = self.state();
        st.status == InstallStatus::Installed && st.uninstallable
    }

    pub fn preview(&self) -> Option<PreviewHandle> {
        self.state().preview.clone()
    }

    fn publish(&self, event: FontEvent) {
        self.services.events.publish(event);
    }

    fn set_status(&self, status: InstallStatus) {
        {
            let mut st = self.state();
            if st.status == status {
                return;
            }
            st.status = status;
        }
        debug!(family = %self.record.family, %status, "status changed");
        self.publish(FontEvent::StatusChanged {
            family: self.record.family.clone(),
            status,
        });
    }

    fn set_preview(&self, path: PathBuf) -> PreviewHandle {
        let handle = PreviewHandle { path };
        {
            let mut st = self.state();
            if st.preview.as_ref() == Some(&handle) {
                return handle;
            }
            st.preview = Some(handle.clone());
        }
        self.publish(FontEvent::PreviewReady {
            family: self.record.family.clone(),
            path: handle.path.clone(),
        });
        handle
    }

    /// Local binary for this font, downloading it through the gate on a miss.
    async fn acquire_binary(&self) -> Result<PathBuf, CoreError> {
        let family = self.record.family.as_str();
        let cache = &self.services.cache;

        if let Some(path) = cache.resolve(family).await? {
            return Ok(path);
        }
        if self.record.download_url.trim().is_empty() {
            return Err(FetchError::EmptyUrl {
                family: family.to_owned(),
            }
            .into());
        }

        let _flight = self.flight.lock().await;
        let _permit = self.services.gate.acquire().await?;

        // Another request may have finished the download while we waited.
        if let Some(path) = cache.resolve(family).await? {
            return Ok(path);
        }

        let bytes = self
            .services
            .fetcher
            .get_bytes(&self.record.download_url)
            .await?;
        cache.store(family, &bytes).await
    }

    /// Make sure a preview binary is available locally.
    ///
    /// Best effort: failures are logged and leave the status untouched.
    pub async fn resolve_preview(&self) -> Option<PreviewHandle> {
        match self.acquire_binary().await {
            Ok(path) => Some(self.set_preview(path)),
            Err(e) => {
                debug!(family = %self.record.family, error = %e, "preview unavailable");
                None
            }
        }
    }

    /// Download (if needed) and register the font.
    ///
    /// A no-op while `Downloading` or `Installed`. Returns the resulting status.
    pub async fn install(&self) -> InstallStatus {
        {
            let mut st = self.state();
            if !st.status.accepts_install() {
                debug!(family = %self.record.family, status = %st.status, "install ignored");
                return st.status;
            }
            st.status = InstallStatus::Downloading;
        }
        self.publish(FontEvent::StatusChanged {
            family: self.record.family.clone(),
            status: InstallStatus::Downloading,
        });

        match self.register().await {
            Ok(installed_path) => {
                let uninstallable = self.query_uninstallable().await;
                self.state().uninstallable = uninstallable;
                self.set_preview(installed_path);
                self.set_status(InstallStatus::Installed);
                info!(family = %self.record.family, uninstallable, "font installed");
            }
            Err(e) => {
                warn!(family = %self.record.family, error = %e, "font install failed");
                self.set_status(InstallStatus::Error);
            }
        }
        self.status()
    }

    /// Registry reads block, so the removability check runs off the runtime.
    async fn query_uninstallable(&self) -> bool {
        let registrar = Arc::clone(&self.services.registrar);
        let family = self.record.family.clone();
        match tokio::task::spawn_blocking(move || registrar.is_uninstallable(&family)).await {
            Ok(uninstallable) => uninstallable,
            Err(e) => {
                warn!(family = %self.record.family, error = %e, "removability check failed");
                false
            }
        }
    }

    async fn register(&self) -> Result<PathBuf, CoreError> {
        let path = self.acquire_binary().await?;
        Ok(self.services.registrar.install(&path).await?)
    }

    /// Unregister an installed font. A no-op unless `Installed`.
    ///
    /// Removability is enforced by the command layer via
    /// [`Self::can_uninstall`], not here.
    pub async fn uninstall(&self) -> InstallStatus {
        let _guard = self.unregister.lock().await;
        if self.status() != InstallStatus::Installed {
            return self.status();
        }

        match self.services.registrar.uninstall(&self.record.family).await {
            Ok(()) => {
                {
                    let mut st = self.state();
                    st.uninstallable = false;
                    st.preview = None;
                }
                self.set_status(InstallStatus::NotInstalled);
                info!(family = %self.record.family, "font uninstalled");
                self.resolve_preview().await;
            }
            Err(e) => {
                warn!(family = %self.record.family, error = %e, "font uninstall failed");
                self.set_status(InstallStatus::Error);
            }
        }
        self.status()
    }

    /// Flip the favorite flag and pass it through to the favorite store.
    pub fn toggle_favorite(&self) -> bool {
        let favorite = !self.is_favorite();
        self.set_favorite(favorite);
        favorite
    }

    pub fn set_favorite(&self, favorite: bool) {
        {
            let mut st = self.state();
            if st.favorite == favorite {
                return;
            }
            st.favorite = favorite;
        }
        self.services
            .favorites
            .set_favorite(&self.record.family, favorite);
        self.publish(FontEvent::FavoriteChanged {
            family: self.record.family.clone(),
            favorite,
        });
    }
}
