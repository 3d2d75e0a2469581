use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RegistrarError;

/// Makes a registered font file visible to running applications.
pub trait FontLoader: Send + Sync + 'static {
    fn load(&self, path: &Path) -> Result<(), RegistrarError>;

    fn unload(&self, path: &Path) -> Result<(), RegistrarError>;

    /// Tell other processes that the font table changed.
    fn broadcast_change(&self);
}

/// Loader for font systems that rescan the user font directory by
/// themselves (fontconfig, CoreText). Only counts calls.
#[derive(Debug, Default)]
pub struct NullLoader {
    loads: AtomicUsize,
    unloads: AtomicUsize,
    broadcasts: AtomicUsize,
}

impl NullLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

impl FontLoader for NullLoader {
    fn load(&self, path: &Path) -> Result<(), RegistrarError> {
        if !path.is_file() {
            return Err(RegistrarError::MissingFile(path.to_path_buf()));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unload(&self, _path: &Path) -> Result<(), RegistrarError> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn broadcast_change(&self) {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
    }
}
