//! Shared types for the fontmgr workspace.
//!
//! Everything here is plain data: catalog records, per-font install status,
//! cache tiers and OS registration entries. Behaviour lives in the
//! `fontmgr-fetch`, `fontmgr-registrar` and `fontmgr-core` crates.

pub mod font;
pub mod registration;
pub mod status;
pub mod tier;

pub use font::{FONT_FILE_EXTENSION, FontRecord, FontSourceType, family_eq, font_file_name, normalize_family};
pub use registration::{RegistrationEntry, RegistrationScope};
pub use status::{InstallStatus, Locale};
pub use tier::CacheTier;
