//! # simplex-settings
//!
//! AI provider configuration persistence.
//!
//! One JSON record (provider tag + API key) stored at
//! `~/.simplex/config.json`, plus display metadata lookup for configured
//! providers. Absence of the file means "not configured".

#![deny(unsafe_code)]

pub mod errors;
pub mod provider_info;
pub mod store;

pub use errors::{Result, SettingsError};
pub use provider_info::{provider_info, ProviderInfo};
pub use store::{config_path, AiConfig, ConfigStore};
