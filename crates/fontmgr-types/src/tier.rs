use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Local storage location for a font binary.
///
/// A file in `Permanent` is always a valid promotion source for `Ephemeral`;
/// the reverse is never assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum CacheTier {
    /// Temp/RAM-backed directory, cleared across sessions.
    #[strum(serialize = "ephemeral")]
    Ephemeral,
    #[strum(serialize = "permanent")]
    Permanent,
}

impl CacheTier {
    /// Tier that receives fresh downloads for the given RAM preference.
    pub fn preferred(load_to_ram: bool) -> Self {
        if load_to_ram {
            CacheTier::Ephemeral
        } else {
            CacheTier::Permanent
        }
    }
}
