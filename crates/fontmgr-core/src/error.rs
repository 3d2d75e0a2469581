use fontmgr_fetch::FetchError;
use fontmgr_registrar::RegistrarError;
use thiserror::Error;

/// Errors surfaced by the acquisition pipeline.
///
/// None of these are fatal: the manager turns them into a fallback result or
/// a font's `Error` status.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog or font binary fetch failed.
    #[error("network failure: {0}")]
    NetworkFailure(#[from] FetchError),

    /// A cached file exists but cannot be used.
    #[error("cache corruption: {0}")]
    CacheCorruption(String),

    /// An OS registration step failed.
    #[error("registration failure: {0}")]
    RegistrationFailure(#[from] RegistrarError),

    /// The family is not in the current catalog.
    #[error("font not found: {0}")]
    NotFound(String),

    /// A filesystem I/O error occurred in the font cache.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
