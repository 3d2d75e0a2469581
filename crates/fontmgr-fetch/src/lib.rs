//! Network side of fontmgr: the byte fetcher seam, the process-wide
//! download gate and the font catalog cache.

pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod gate;

pub use catalog::{CatalogCache, CatalogItem, CatalogResponse, CatalogSource};
pub use error::FetchError;
pub use fetcher::{Fetcher, HttpFetcher, MemoryFetcher};
pub use gate::{DEFAULT_DOWNLOAD_CONCURRENCY, DownloadGate, DownloadPermit};
