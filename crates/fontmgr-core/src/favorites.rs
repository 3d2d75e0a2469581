//! Favorited family names.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::warn;

/// Set of favorited families. The UI queries and toggles it; the core only
/// passes calls through.
pub trait FavoriteStore: Send + Sync {
    fn is_favorite(&self, family: &str) -> bool;

    fn set_favorite(&self, family: &str, favorite: bool);
}

/// Favorites kept as a JSON array of family names.
///
/// Loaded once on open and rewritten on every change. Unreadable files start
/// empty; failed saves are logged and otherwise ignored.
#[derive(Debug)]
pub struct JsonFavoriteStore {
    path: PathBuf,
    favorites: RwLock<HashSet<String>>,
}

impl JsonFavoriteStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let favorites = load(&path);
        Self {
            path,
            favorites: RwLock::new(favorites),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn families(&self) -> Vec<String> {
        let mut families: Vec<String> = self
            .favorites
            .read()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        families.sort();
        families
    }

    fn save(&self, favorites: &HashSet<String>) {
        let mut list: Vec<&String> = favorites.iter().collect();
        list.sort();
        let result = serde_json::to_vec(&list)
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(dir) = self.path.parent() {
                    fs::create_dir_all(dir)?;
                }
                fs::write(&self.path, json)
            });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failed to save favorites");
        }
    }
}

fn load(path: &Path) -> HashSet<String> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(_) => return HashSet::new(),
    };
    match serde_json::from_slice::<Vec<String>>(&raw) {
        Ok(list) => list.into_iter().collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "favorites file is corrupt; starting empty");
            HashSet::new()
        }
    }
}

impl FavoriteStore for JsonFavoriteStore {
    fn is_favorite(&self, family: &str) -> bool {
        self.favorites
            .read()
            .map(|set| set.contains(family))
            .unwrap_or(false)
    }

    fn set_favorite(&self, family: &str, favorite: bool) {
        let Ok(mut set) = self.favorites.write() else {
            return;
        };
        let changed = if favorite {
            set.insert(family.to_owned())
        } else {
            set.remove(family)
        };
        if changed {
            self.save(&set);
        }
    }
}
