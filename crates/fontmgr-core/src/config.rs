//! Runtime configuration, loaded from environment variables or built by the host.

use std::path::PathBuf;

use fontmgr_fetch::{CatalogSource, DEFAULT_DOWNLOAD_CONCURRENCY};

const APP_DIR: &str = "FontManager";

/// Settings the core reads. Persisting them is the host's job.
///
/// Every field has a default so the manager works without any environment
/// variables set.
#[derive(Clone)]
pub struct Config {
    /// Google Fonts developer API key.
    pub api_key: Option<String>,

    /// Query the Google Fonts API instead of the public mirror listing.
    pub use_api_directly: bool,

    /// Prefer the RAM-backed ephemeral tier for font binaries.
    pub load_to_ram: bool,

    /// Per-application local data directory (catalog blob, favorites,
    /// permanent font tier).
    pub data_dir: PathBuf,

    /// Ephemeral font tier, under the process temp area.
    pub ephemeral_dir: PathBuf,

    /// Maximum simultaneous font binary downloads.
    pub download_concurrency: usize,

    /// `tracing` filter string, e.g. `"info"` or `"fontmgr_core=debug"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("use_api_directly", &self.use_api_directly)
            .field("load_to_ram", &self.load_to_ram)
            .field("data_dir", &self.data_dir)
            .field("ephemeral_dir", &self.ephemeral_dir)
            .field("download_concurrency", &self.download_concurrency)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::rooted(default_data_dir(), default_ephemeral_dir())
    }
}

impl Config {
    /// Defaults with explicit storage roots.
    pub fn rooted(data_dir: impl Into<PathBuf>, ephemeral_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_key: None,
            use_api_directly: false,
            load_to_ram: false,
            data_dir: data_dir.into(),
            ephemeral_dir: ephemeral_dir.into(),
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            log_level: "info".to_owned(),
            log_json: false,
        }
    }

    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("FONTMGR_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            use_api_directly: env_flag("FONTMGR_USE_API"),
            load_to_ram: env_flag("FONTMGR_LOAD_TO_RAM"),
            data_dir: std::env::var_os("FONTMGR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            ephemeral_dir: std::env::var_os("FONTMGR_EPHEMERAL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_ephemeral_dir),
            download_concurrency: parse_env("FONTMGR_DOWNLOAD_CONCURRENCY", DEFAULT_DOWNLOAD_CONCURRENCY),
            log_level: env_or("FONTMGR_LOG", "info"),
            log_json: env_flag("FONTMGR_LOG_JSON"),
        }
    }

    pub fn with_load_to_ram(mut self, load_to_ram: bool) -> Self {
        self.load_to_ram = load_to_ram;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>, use_api_directly: bool) -> Self {
        self.api_key = Some(api_key.into());
        self.use_api_directly = use_api_directly;
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("Cache")
    }

    /// Permanent font tier.
    pub fn permanent_dir(&self) -> PathBuf {
        self.cache_dir().join("fonts")
    }

    pub fn favorites_path(&self) -> PathBuf {
        self.data_dir.join("Data").join("favorites.json")
    }

    /// Listing endpoint selected by the API settings.
    pub fn catalog_source(&self) -> CatalogSource {
        CatalogSource::from_settings(self.api_key.as_deref(), self.use_api_directly)
    }
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn default_ephemeral_dir() -> PathBuf {
    std::env::temp_dir().join(APP_DIR).join("fonts")
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_data_dir() {
        let cfg = Config::rooted("/data/fm", "/tmp/fm");
        assert_eq!(cfg.permanent_dir(), PathBuf::from("/data/fm/Cache/fonts"));
        assert_eq!(cfg.favorites_path(), PathBuf::from("/data/fm/Data/favorites.json"));
        assert_eq!(cfg.download_concurrency, 4);
        assert!(!cfg.load_to_ram);
    }

    #[test]
    fn catalog_source_follows_api_settings() {
        let cfg = Config::rooted("/d", "/e");
        assert_eq!(cfg.catalog_source(), CatalogSource::mirror());

        let cfg = cfg.with_api_key("secret", true);
        assert!(matches!(cfg.catalog_source(), CatalogSource::GoogleApi { .. }));
        assert!(!format!("{cfg:?}").contains("secret"));
    }

    #[test]
    fn flags_accept_one_and_true() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag("0"));
    }

    #[test]
    fn unset_variables_use_defaults() {
        assert_eq!(parse_env("FONTMGR_TEST_UNSET_VARIABLE", 7usize), 7);
        assert_eq!(env_or("FONTMGR_TEST_UNSET_VARIABLE", "info"), "info");
    }
}
