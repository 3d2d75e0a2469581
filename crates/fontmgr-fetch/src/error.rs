use thiserror::Error;

/// Errors that can be returned by fontmgr-fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// An HTTP request failed (connection, TLS, body read, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// A filesystem I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The record has no download URL to fetch from.
    #[error("no download URL for {family}")]
    EmptyUrl { family: String },

    /// No fixture is registered for the URL (in-memory fetcher only).
    #[error("no such resource: {0}")]
    NotFound(String),

    /// The download gate was shut down while waiting for a slot.
    #[error("download gate closed")]
    GateClosed,
}
