use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Install/download status of a single font.
///
/// `NotInstalled -> Downloading -> Installed | Error`, and
/// `Installed -> NotInstalled` after a successful uninstall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
pub enum InstallStatus {
    #[default]
    #[strum(serialize = "not_installed")]
    NotInstalled,
    #[strum(serialize = "downloading")]
    Downloading,
    #[strum(serialize = "installed")]
    Installed,
    #[strum(serialize = "error")]
    Error,
}

/// Language used for user-visible status labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum Locale {
    #[default]
    #[strum(serialize = "en")]
    En,
    #[strum(serialize = "ja")]
    Ja,
}

impl InstallStatus {
    /// A new install attempt may only start from these states.
    pub fn accepts_install(self) -> bool {
        matches!(self, InstallStatus::NotInstalled | InstallStatus::Error)
    }

    /// An install is in flight.
    pub fn is_busy(self) -> bool {
        self == InstallStatus::Downloading
    }

    /// Label shown on the install button for this status.
    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::En, InstallStatus::NotInstalled) => "Install",
            (Locale::En, InstallStatus::Downloading) => "Downloading...",
            (Locale::En, InstallStatus::Installed) => "Installed",
            (Locale::En, InstallStatus::Error) => "Error",
            (Locale::Ja, InstallStatus::NotInstalled) => "インストール",
            (Locale::Ja, InstallStatus::Downloading) => "DL中...",
            (Locale::Ja, InstallStatus::Installed) => "完了",
            (Locale::Ja, InstallStatus::Error) => "エラー",
        }
    }
}
