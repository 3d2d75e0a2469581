//! The registrar capability set and its store-backed implementation.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fontmgr_types::{RegistrationEntry, RegistrationScope, family_eq, normalize_family};
use tracing::{debug, info, warn};

use crate::error::RegistrarError;
use crate::loader::FontLoader;
use crate::store::RegistrationStore;

/// Suffix appended to the display key of every entry we register.
pub const TRUETYPE_SUFFIX: &str = " (TrueType)";

/// Install, uninstall and query fonts in the OS font registry.
#[async_trait]
pub trait FontRegistrar: Send + Sync {
    /// Register the font at `path` for the current user.
    ///
    /// Returns the location the font was registered from.
    async fn install(&self, path: &Path) -> Result<PathBuf, RegistrarError>;

    /// Unregister the user-scope font whose key matches `family`.
    async fn uninstall(&self, family: &str) -> Result<(), RegistrarError>;

    /// Installed display keys from both scopes, deduplicated case-insensitively.
    ///
    /// A scope that cannot be read contributes nothing.
    fn enumerate_installed(&self) -> BTreeSet<String>;

    /// True only for fonts whose backing file lives in the user font directory.
    fn is_uninstallable(&self, family: &str) -> bool;

    fn user_font_dir(&self) -> &Path;

    /// Case-insensitive substring match against [`Self::enumerate_installed`].
    fn is_installed(&self, family: &str) -> bool {
        contains_family(&self.enumerate_installed(), family)
    }
}

/// Whether any installed name contains `family`, ignoring case.
pub fn contains_family<'a>(names: impl IntoIterator<Item = &'a String>, family: &str) -> bool {
    let needle = family.to_lowercase();
    names
        .into_iter()
        .any(|name| name.to_lowercase().contains(&needle))
}

/// `Noto_Sans.ttf` -> `Noto Sans (TrueType)`.
pub fn display_key(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(format!("{}{TRUETYPE_SUFFIX}", stem.replace('_', " ")))
}

/// Matches the key's name part against the family or its underscore spelling.
pub fn entry_matches(entry: &RegistrationEntry, family: &str) -> bool {
    let name = entry.display_name();
    family_eq(name, family)
        || family_eq(name, &normalize_family(family))
        || family_eq(&name.replace('_', " "), family)
}

/// Resolves `.` and `..` components without touching the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(windows)]
fn is_within(path: &Path, dir: &Path) -> bool {
    let lower = |p: &Path| PathBuf::from(lexical(p).to_string_lossy().to_lowercase());
    lower(path).starts_with(lower(dir))
}

#[cfg(not(windows))]
fn is_within(path: &Path, dir: &Path) -> bool {
    lexical(path).starts_with(lexical(dir))
}

/// [`FontRegistrar`] over a [`RegistrationStore`] and a [`FontLoader`].
///
/// Fonts are copied into `user_font_dir` and registered in the user scope.
/// The system scope is only ever read.
pub struct StoreRegistrar<S, L> {
    store: Arc<S>,
    loader: Arc<L>,
    user_font_dir: PathBuf,
}

impl<S, L> Clone for StoreRegistrar<S, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            loader: Arc::clone(&self.loader),
            user_font_dir: self.user_font_dir.clone(),
        }
    }
}

impl<S: RegistrationStore, L: FontLoader> StoreRegistrar<S, L> {
    pub fn new(store: Arc<S>, loader: Arc<L>, user_font_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            loader,
            user_font_dir: user_font_dir.into(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn loader(&self) -> &Arc<L> {
        &self.loader
    }

    fn install_blocking(&self, source: &Path) -> Result<PathBuf, RegistrarError> {
        if !source.is_file() {
            return Err(RegistrarError::MissingFile(source.to_path_buf()));
        }
        let file_name = source
            .file_name()
            .ok_or_else(|| RegistrarError::InvalidPath(source.to_path_buf()))?;
        let key = display_key(source)
            .ok_or_else(|| RegistrarError::InvalidPath(source.to_path_buf()))?;

        fs::create_dir_all(&self.user_font_dir)?;
        let target = self.user_font_dir.join(file_name);
        if !target.exists() {
            fs::copy(source, &target)?;
            debug!(from = %source.display(), to = %target.display(), "font copied");
        }

        self.store.set(RegistrationScope::User, &key, &target)?;
        if let Err(e) = self.loader.load(&target) {
            if let Err(rollback) = self.store.remove(RegistrationScope::User, &key) {
                warn!(%key, error = %rollback, "failed to roll back registration");
            }
            return Err(e);
        }
        self.loader.broadcast_change();

        info!(%key, path = %target.display(), "font registered");
        Ok(target)
    }

    fn uninstall_blocking(&self, family: &str) -> Result<(), RegistrarError> {
        let entry = self
            .store
            .entries(RegistrationScope::User)?
            .into_iter()
            .find(|entry| entry_matches(entry, family))
            .ok_or_else(|| RegistrarError::NotFound(family.to_owned()))?;

        if !entry.path.is_file() {
            return Err(RegistrarError::MissingFile(entry.path));
        }

        if let Err(e) = self.loader.unload(&entry.path) {
            warn!(key = %entry.key, error = %e, "font unload failed; removing registration anyway");
        }
        self.store.remove(RegistrationScope::User, &entry.key)?;
        if let Err(e) = fs::remove_file(&entry.path) {
            warn!(path = %entry.path.display(), error = %e, "failed to delete font file");
        }
        self.loader.broadcast_change();

        info!(key = %entry.key, "font unregistered");
        Ok(())
    }

    fn scope_entries(&self, scope: RegistrationScope) -> Vec<RegistrationEntry> {
        match self.store.entries(scope) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%scope, error = %e, "failed to read registration scope");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<S: RegistrationStore, L: FontLoader> FontRegistrar for StoreRegistrar<S, L> {
    async fn install(&self, path: &Path) -> Result<PathBuf, RegistrarError> {
        let this = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || this.install_blocking(&path))
            .await
            .map_err(|e| RegistrarError::Join(e.to_string()))?
    }

    async fn uninstall(&self, family: &str) -> Result<(), RegistrarError> {
        let this = self.clone();
        let family = family.to_owned();
        tokio::task::spawn_blocking(move || this.uninstall_blocking(&family))
            .await
            .map_err(|e| RegistrarError::Join(e.to_string()))?
    }

    fn enumerate_installed(&self) -> BTreeSet<String> {
        let mut seen = HashSet::new();
        let mut names = BTreeSet::new();
        for scope in RegistrationScope::ALL {
            for entry in self.scope_entries(scope) {
                if seen.insert(entry.key.to_lowercase()) {
                    names.insert(entry.key);
                }
            }
        }
        names
    }

    fn is_uninstallable(&self, family: &str) -> bool {
        RegistrationScope::ALL.into_iter().any(|scope| {
            self.scope_entries(scope)
                .iter()
                .any(|entry| entry_matches(entry, family) && is_within(&entry.path, &self.user_font_dir))
        })
    }

    fn user_font_dir(&self) -> &Path {
        &self.user_font_dir
    }
}
