//! Engine configuration.
//!
//! # Responsibility
//! - Resolve where state is stored, under which key, and how logging runs.
//! - Merge defaults, an optional JSON file and environment overrides.
//!
//! # Invariants
//! - Missing fields fall back to defaults; unknown fields are ignored.
//! - Environment variables win over file values; blank variables are ignored.

use crate::logging::default_log_level;
use crate::persistence::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "LIFESYNC_DB_PATH";
pub const ENV_STORAGE_KEY: &str = "LIFESYNC_STORAGE_KEY";
pub const ENV_LOG_LEVEL: &str = "LIFESYNC_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LIFESYNC_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "lifesync.sqlite3";

/// Configuration load failures.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Runtime settings shared by the CLI and FFI front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite file holding the storage slots.
    pub db_path: PathBuf,
    /// Slot key of the state document.
    pub storage_key: String,
    /// `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute log directory; file logging is skipped when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Reads a JSON config file, then applies environment overrides.
    ///
    /// # Errors
    /// - `ConfigError::Io` when the file cannot be read.
    /// - `ConfigError::Parse` when the file is not valid JSON for this shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies `LIFESYNC_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(path) = non_blank(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(key) = non_blank(ENV_STORAGE_KEY) {
            self.storage_key = key;
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = non_blank(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "storage_key": "custom_key", "extra": 1 }"#).unwrap();

        let mut expected = EngineConfig {
            storage_key: "custom_key".to_string(),
            ..EngineConfig::default()
        };
        expected.apply_env_overrides();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config, expected);
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/data/lifesync.db"),
            (ENV_STORAGE_KEY, "   "),
            (ENV_LOG_LEVEL, "warn"),
        ]);
        let mut config = EngineConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|value| value.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/data/lifesync.db"));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn load_reports_missing_file_as_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
