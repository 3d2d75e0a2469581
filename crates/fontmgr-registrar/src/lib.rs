//! OS font registration for fontmgr.
//!
//! [`FontRegistrar`] is the capability set the rest of the workspace talks
//! to. [`StoreRegistrar`] implements it over a scoped key/value
//! [`RegistrationStore`] and a [`FontLoader`]; the platform picks the pair:
//!
//! | platform | store                  | loader       |
//! |----------|------------------------|--------------|
//! | Windows  | `WindowsRegistryStore` | `GdiLoader`  |
//! | other    | [`JsonFileStore`]      | [`NullLoader`] |
//!
//! [`MemoryStore`] backs tests.

pub mod error;
pub mod loader;
pub mod registrar;
pub mod store;
#[cfg(windows)]
pub mod win32;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::RegistrarError;
pub use loader::{FontLoader, NullLoader};
pub use registrar::{FontRegistrar, StoreRegistrar, TRUETYPE_SUFFIX, display_key, entry_matches};
pub use store::{JsonFileStore, MemoryStore, RegistrationStore};
#[cfg(windows)]
pub use win32::{GdiLoader, WindowsRegistryStore};

#[cfg(windows)]
pub type PlatformRegistrar = StoreRegistrar<WindowsRegistryStore, GdiLoader>;
#[cfg(not(windows))]
pub type PlatformRegistrar = StoreRegistrar<JsonFileStore, NullLoader>;

/// Per-user font directory that installed fonts are copied into.
#[cfg(windows)]
pub fn default_user_font_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("Microsoft")
        .join("Windows")
        .join("Fonts")
}

#[cfg(target_os = "macos")]
pub fn default_user_font_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("Library")
        .join("Fonts")
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn default_user_font_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("fonts")
}

/// The registrar for the current platform.
///
/// `data_dir` holds the registration file on hosts without a registry.
#[cfg(windows)]
pub fn default_registrar(_data_dir: &Path) -> PlatformRegistrar {
    StoreRegistrar::new(
        Arc::new(WindowsRegistryStore::new()),
        Arc::new(GdiLoader::new()),
        default_user_font_dir(),
    )
}

#[cfg(not(windows))]
pub fn default_registrar(data_dir: &Path) -> PlatformRegistrar {
    StoreRegistrar::new(
        Arc::new(JsonFileStore::in_dir(data_dir)),
        Arc::new(NullLoader::new()),
        default_user_font_dir(),
    )
}
