//! Two-tier local store for font binaries.
//!
//! The active tier is `Ephemeral` when RAM loading is preferred and
//! `Permanent` otherwise. A lookup succeeds when either tier holds the file.
//! With RAM loading on, a file found only in the permanent tier is promoted
//! (copied) into the ephemeral one, and fresh downloads are mirrored to the
//! permanent tier so they survive the session.

use std::path::{Path, PathBuf};

use fontmgr_types::{CacheTier, font_file_name};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct TieredFontCache {
    ephemeral_dir: PathBuf,
    permanent_dir: PathBuf,
    load_to_ram: bool,
}

impl TieredFontCache {
    pub fn new(
        ephemeral_dir: impl Into<PathBuf>,
        permanent_dir: impl Into<PathBuf>,
        load_to_ram: bool,
    ) -> Self {
        Self {
            ephemeral_dir: ephemeral_dir.into(),
            permanent_dir: permanent_dir.into(),
            load_to_ram,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.ephemeral_dir.clone(), cfg.permanent_dir(), cfg.load_to_ram)
    }

    pub fn active_tier(&self) -> CacheTier {
        CacheTier::preferred(self.load_to_ram)
    }

    pub fn dir(&self, tier: CacheTier) -> &Path {
        match tier {
            CacheTier::Ephemeral => &self.ephemeral_dir,
            CacheTier::Permanent => &self.permanent_dir,
        }
    }

    pub fn tier_path(&self, tier: CacheTier, family: &str) -> PathBuf {
        self.dir(tier).join(font_file_name(family))
    }

    /// Where `family` lives in the active tier. Pure; touches no files.
    pub fn local_path(&self, family: &str) -> PathBuf {
        self.tier_path(self.active_tier(), family)
    }

    /// Path of a usable local copy of `family`, active tier first.
    ///
    /// With RAM loading on, a permanent copy is promoted into the ephemeral
    /// tier. Otherwise a leftover ephemeral copy is used in place.
    pub async fn resolve(&self, family: &str) -> Result<Option<PathBuf>, CoreError> {
        let local = self.local_path(family);
        if is_usable(&local).await {
            return Ok(Some(local));
        }

        if self.load_to_ram {
            let permanent = self.tier_path(CacheTier::Permanent, family);
            if is_usable(&permanent).await {
                let bytes = tokio::fs::read(&permanent).await?;
                write_atomic(&local, &bytes).await?;
                debug!(%family, from = %permanent.display(), to = %local.display(), "promoted font to ephemeral tier");
                return Ok(Some(local));
            }
        } else {
            let ephemeral = self.tier_path(CacheTier::Ephemeral, family);
            if is_usable(&ephemeral).await {
                debug!(%family, path = %ephemeral.display(), "using ephemeral copy");
                return Ok(Some(ephemeral));
            }
        }

        Ok(None)
    }

    /// Write a downloaded binary to the active tier (plus the permanent
    /// mirror when RAM loading is on) and return the active-tier path.
    pub async fn store(&self, family: &str, bytes: &[u8]) -> Result<PathBuf, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::CacheCorruption(format!("empty font body for {family}")));
        }

        let local = self.local_path(family);
        write_atomic(&local, bytes).await?;

        if self.load_to_ram {
            let permanent = self.tier_path(CacheTier::Permanent, family);
            if let Err(e) = write_atomic(&permanent, bytes).await {
                warn!(%family, path = %permanent.display(), error = %e, "permanent mirror write failed");
            }
        }

        debug!(%family, path = %local.display(), bytes = bytes.len(), "font cached");
        Ok(local)
    }
}

/// A cache entry counts only if it is a non-empty regular file.
async fn is_usable(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Full overwrite through a temp file, so racing writers never expose a
/// partially written font.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = path.with_extension(format!("{}.part", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
