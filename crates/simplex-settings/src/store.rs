//! File-backed store for the AI configuration record.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::Result;

/// The persisted AI configuration record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider tag, e.g. `"gemini"`.
    pub provider: String,
    /// Provider API key.
    pub api_key: String,
}

/// Resolve the default config path (`~/.simplex/config.json`).
#[must_use]
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".simplex").join("config.json")
}

/// Reads and writes the single [`AiConfig`] record at a fixed path.
///
/// The store itself takes no locks; the gateway's receive loops are the only
/// writers and handle config frames one at a time per connection.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store reading and writing `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default path.
    #[must_use]
    pub fn at_default_path() -> Self {
        Self::new(config_path())
    }

    /// Path this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration.
    ///
    /// Returns `None` when the file is missing, unreadable, or holds
    /// invalid JSON; read failures are logged, not propagated.
    pub fn load(&self) -> Option<AiConfig> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read config file");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to parse config file");
                None
            }
        }
    }

    /// Persist `config`, creating parent directories as needed.
    pub fn save(&self, config: &AiConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(config)?)?;
        debug!(path = %self.path.display(), provider = %config.provider, "config saved");
        Ok(())
    }

    /// Remove the persisted configuration. A missing file is not an error.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "config deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("config.json"))
    }

    fn sample() -> AiConfig {
        AiConfig {
            provider: "gemini".into(),
            api_key: "AIza-test".into(),
        }
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().is_none());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();
        assert_eq!(store.load(), Some(sample()));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("config.json"));
        store.save(&sample()).unwrap();
        assert!(store.load().is_some());
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();
        let updated = AiConfig {
            provider: "openai".into(),
            api_key: "sk-other".into(),
        };
        store.save(&updated).unwrap();
        assert_eq!(store.load(), Some(updated));
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn delete_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();
        store.delete().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).delete().is_ok());
    }

    #[test]
    fn default_path_ends_with_simplex_config() {
        let path = config_path();
        assert!(path.ends_with(".simplex/config.json"));
    }
}
