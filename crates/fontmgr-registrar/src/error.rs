use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by font registration backends.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// No registration entry matches the requested family.
    #[error("no registration entry for {0}")]
    NotFound(String),

    /// A font file the operation depends on does not exist.
    #[error("font file is missing: {}", .0.display())]
    MissingFile(PathBuf),

    /// The path has no usable file name.
    #[error("invalid font path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A filesystem I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a JSON registration file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The registration store refused a read or write.
    #[error("registration store error: {0}")]
    Store(String),

    /// The OS font loader rejected the file.
    #[error("font load failed: {0}")]
    Load(String),

    /// A blocking registrar task panicked or was cancelled.
    #[error("registrar task failed: {0}")]
    Join(String),
}
