//! fontmgr-core: font acquisition and installation pipeline.
//!
//! A [`FontManager`] turns the remote catalog into one [`FontItem`] per font.
//! Each item runs its own install state machine over shared collaborators:
//!
//! 1. [`TieredFontCache`] resolves a local binary (ephemeral or permanent tier).
//! 2. On a miss, a slot of the process-wide [`DownloadGate`] is taken and the
//!    binary is fetched.
//! 3. The [`FontRegistrar`] registers it with the OS.
//!
//! State changes are published as [`FontEvent`]s.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod favorites;
pub mod item;
pub mod manager;
pub mod telemetry;

pub use cache::TieredFontCache;
pub use config::Config;
pub use error::CoreError;
pub use events::{EventBus, FontEvent};
pub use favorites::{FavoriteStore, JsonFavoriteStore};
pub use item::{FontItem, FontServices, PreviewHandle};
pub use manager::{FontManager, FontManagerBuilder};

pub use fontmgr_fetch::{CatalogSource, DownloadGate, Fetcher, HttpFetcher, MemoryFetcher};
pub use fontmgr_registrar::FontRegistrar;
pub use fontmgr_types::{FontRecord, InstallStatus, Locale};
