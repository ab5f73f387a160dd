//! # Whippet Settings
//!
//! Application settings grouped under named setting groups. Values are kept
//! as text; [`Setting::as_flag`] reads the common boolean spellings.
//!
//! ## Features
//!
//! - `test-utils` (default): in-memory repositories ([`mocks`])
//! - `postgres`: repositories over the `whippet` schema ([`stores::postgres`])

pub mod handlers;
pub mod settings;
pub mod stores;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-exports
pub use handlers::{SettingsStore, register_handlers};
pub use settings::{
    GetSettingByName, GetSettingGroupByName, GetSettingsByGroup, Setting, SettingGroup,
    SettingGroupRepository, SettingRepository,
};
