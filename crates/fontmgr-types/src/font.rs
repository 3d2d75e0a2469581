use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// File extension used for every cached or installed font binary.
pub const FONT_FILE_EXTENSION: &str = "ttf";

/// Where a catalog record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
pub enum FontSourceType {
    #[default]
    #[strum(serialize = "google_fonts")]
    GoogleFonts,
    #[strum(serialize = "custom")]
    Custom,
}

/// One downloadable font family, as described by the catalog.
///
/// Records are built once per catalog refresh and never mutated afterwards;
/// the family name is the identity and is matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontRecord {
    pub family: String,
    pub author: String,
    pub license: String,
    pub description: String,
    pub download_url: String,
    pub tags: Vec<String>,
    pub subsets: Vec<String>,
    pub source_type: FontSourceType,
}

impl FontRecord {
    /// Minimal record with only a family name and download URL.
    pub fn new(family: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            author: String::new(),
            license: String::new(),
            description: String::new(),
            download_url: download_url.into(),
            tags: Vec::new(),
            subsets: Vec::new(),
            source_type: FontSourceType::default(),
        }
    }

    pub fn matches_family(&self, family: &str) -> bool {
        family_eq(&self.family, family)
    }
}

/// Case-insensitive family comparison.
pub fn family_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Replace spaces with underscores so the family can be used as a file stem.
pub fn normalize_family(family: &str) -> String {
    family.trim().replace(' ', "_")
}

pub fn font_file_name(family: &str) -> String {
    format!("{}.{}", normalize_family(family), FONT_FILE_EXTENSION)
}
