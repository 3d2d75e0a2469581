//! Scoped `display key -> font path` namespaces.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fontmgr_types::{RegistrationEntry, RegistrationScope};
use serde::{Deserialize, Serialize};

use crate::error::RegistrarError;

/// Persistent key/value registration namespace with two scopes.
///
/// Keys are compared case-insensitively, like the Windows registry value
/// names they model. Implementations are blocking; the registrar calls them
/// from `spawn_blocking`.
pub trait RegistrationStore: Send + Sync + 'static {
    /// All entries of `scope`, in the store's enumeration order.
    fn entries(&self, scope: RegistrationScope) -> Result<Vec<RegistrationEntry>, RegistrarError>;

    /// Insert or overwrite the entry named `key`.
    fn set(&self, scope: RegistrationScope, key: &str, path: &Path) -> Result<(), RegistrarError>;

    /// Remove the entry named `key`; removing a missing key is not an error.
    fn remove(&self, scope: RegistrationScope, key: &str) -> Result<(), RegistrarError>;
}

fn same_key(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// In-process store. Insertion order is enumeration order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scopes: Mutex<HashMap<RegistrationScope, Vec<(String, PathBuf)>>>,
    unreadable: Mutex<HashSet<RegistrationScope>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, scope: RegistrationScope, key: &str, path: impl AsRef<Path>) -> Self {
        let _ = self.set(scope, key, path.as_ref());
        self
    }

    /// Make every read of `scope` fail, as a broken registry hive would.
    pub fn set_unreadable(&self, scope: RegistrationScope, unreadable: bool) {
        if let Ok(mut set) = self.unreadable.lock() {
            if unreadable {
                set.insert(scope);
            } else {
                set.remove(&scope);
            }
        }
    }

    fn poisoned() -> RegistrarError {
        RegistrarError::Store("memory store lock poisoned".to_owned())
    }
}

impl RegistrationStore for MemoryStore {
    fn entries(&self, scope: RegistrationScope) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        if self.unreadable.lock().map_err(|_| Self::poisoned())?.contains(&scope) {
            return Err(RegistrarError::Store(format!("{scope} scope is unreadable")));
        }
        let scopes = self.scopes.lock().map_err(|_| Self::poisoned())?;
        Ok(scopes
            .get(&scope)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, path)| RegistrationEntry::new(key.clone(), path.clone(), scope))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn set(&self, scope: RegistrationScope, key: &str, path: &Path) -> Result<(), RegistrarError> {
        let mut scopes = self.scopes.lock().map_err(|_| Self::poisoned())?;
        let entries = scopes.entry(scope).or_default();
        match entries.iter_mut().find(|(k, _)| same_key(k, key)) {
            Some(existing) => existing.1 = path.to_path_buf(),
            None => entries.push((key.to_owned(), path.to_path_buf())),
        }
        Ok(())
    }

    fn remove(&self, scope: RegistrationScope, key: &str) -> Result<(), RegistrarError> {
        let mut scopes = self.scopes.lock().map_err(|_| Self::poisoned())?;
        if let Some(entries) = scopes.get_mut(&scope) {
            entries.retain(|(k, _)| !same_key(k, key));
        }
        Ok(())
    }
}

/// On-disk layout of [`JsonFileStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistrationFile {
    #[serde(default)]
    user: BTreeMap<String, PathBuf>,
    #[serde(default)]
    system: BTreeMap<String, PathBuf>,
}

impl RegistrationFile {
    fn scope(&self, scope: RegistrationScope) -> &BTreeMap<String, PathBuf> {
        match scope {
            RegistrationScope::User => &self.user,
            RegistrationScope::System => &self.system,
        }
    }

    fn scope_mut(&mut self, scope: RegistrationScope) -> &mut BTreeMap<String, PathBuf> {
        match scope {
            RegistrationScope::User => &mut self.user,
            RegistrationScope::System => &mut self.system,
        }
    }
}

/// Registration store kept in a single JSON document.
///
/// Used on hosts without a registry; the font system itself discovers files
/// in the user font directory, this file only tracks what fontmgr put there.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

pub const REGISTRATION_FILE: &str = "registrations.json";

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(REGISTRATION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RegistrationFile, RegistrarError> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistrationFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &RegistrationFile) -> Result<(), RegistrarError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self
            .path
            .with_extension(format!("{}.part", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, serde_json::to_vec_pretty(file)?)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn update(
        &self,
        scope: RegistrationScope,
        f: impl FnOnce(&mut BTreeMap<String, PathBuf>),
    ) -> Result<(), RegistrarError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| RegistrarError::Store("registration file lock poisoned".to_owned()))?;
        let mut file = self.read()?;
        f(file.scope_mut(scope));
        self.write(&file)
    }
}

impl RegistrationStore for JsonFileStore {
    fn entries(&self, scope: RegistrationScope) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        let file = self.read()?;
        Ok(file
            .scope(scope)
            .iter()
            .map(|(key, path)| RegistrationEntry::new(key.clone(), path.clone(), scope))
            .collect())
    }

    fn set(&self, scope: RegistrationScope, key: &str, path: &Path) -> Result<(), RegistrarError> {
        self.update(scope, |map| {
            map.retain(|k, _| !same_key(k, key));
            map.insert(key.to_owned(), path.to_path_buf());
        })
    }

    fn remove(&self, scope: RegistrationScope, key: &str) -> Result<(), RegistrarError> {
        self.update(scope, |map| map.retain(|k, _| !same_key(k, key)))
    }
}
