use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::error::FetchError;

/// Number of font binaries that may download at the same time.
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;

/// RAII guard that releases a gate slot when dropped.
///
/// Callers must hold this for the whole byte-fetch of a font binary.
pub struct DownloadPermit {
    #[allow(dead_code)]
    permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for DownloadPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadPermit").finish()
    }
}

/// Process-wide counting gate for font binary downloads.
///
/// Clones share the same slots. Waiters are served in the semaphore's FIFO
/// order; there is no other priority or fairness guarantee. Catalog fetches
/// do not go through the gate.
#[derive(Debug, Clone)]
pub struct DownloadGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl DownloadGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait until a slot is free. Dropping the permit releases it.
    pub async fn acquire(&self) -> Result<DownloadPermit, FetchError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::GateClosed)?;
        trace!(available = self.semaphore.available_permits(), "download slot acquired");
        Ok(DownloadPermit { permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Refuse all further acquisitions; pending waiters get `GateClosed`.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for DownloadGate {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_CONCURRENCY)
    }
}
