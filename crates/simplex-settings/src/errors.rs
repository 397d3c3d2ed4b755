//! Configuration store error types.

use thiserror::Error;

/// Errors that can occur while reading or writing the config file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Filesystem access to the config file failed.
    #[error("config file access failed: {0}")]
    Io(#[from] std::io::Error),
    /// The config record could not be encoded or decoded.
    #[error("config record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
