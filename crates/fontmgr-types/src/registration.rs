use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Visibility of an OS font registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum RegistrationScope {
    #[strum(serialize = "user")]
    User,
    #[strum(serialize = "system")]
    System,
}

impl RegistrationScope {
    pub const ALL: [RegistrationScope; 2] = [RegistrationScope::User, RegistrationScope::System];
}

/// One `display key -> file path` record in the OS registration store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEntry {
    pub key: String,
    pub path: PathBuf,
    pub scope: RegistrationScope,
}

impl RegistrationEntry {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>, scope: RegistrationScope) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            scope,
        }
    }

    /// The key without its trailing `(TrueType)`-style qualifier.
    pub fn display_name(&self) -> &str {
        match self.key.rfind(" (") {
            Some(idx) if self.key.ends_with(')') => self.key[..idx].trim_end(),
            _ => self.key.trim_end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_qualifier() {
        let entry = RegistrationEntry::new(
            "Noto Sans (TrueType)",
            "/fonts/Noto_Sans.ttf",
            RegistrationScope::User,
        );
        assert_eq!(entry.display_name(), "Noto Sans");

        let bare = RegistrationEntry::new("Arial", "arial.ttf", RegistrationScope::System);
        assert_eq!(bare.display_name(), "Arial");
    }
}
