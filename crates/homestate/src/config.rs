//! Configuration file parsing and structures.
//!
//! homestate reads a single TOML file. Every section is optional so an empty
//! file (or no file at all) yields a working setup serving on 127.0.0.1:5000.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing_subscriber::filter::LevelFilter;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"homestate::api" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

/// HTTP listener configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1" or "0.0.0.0"
    pub listen: String,

    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Where the home snapshot comes from and goes to
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bootstrap document read at startup. Built-in defaults are used when unset.
    pub seed: Option<PathBuf>,

    /// Document rewritten after every change
    pub data: PathBuf,

    /// Start from `data` instead of `seed` when it already exists
    pub resume: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            seed: None,
            data: PathBuf::from("data.json"),
            resume: false,
        }
    }
}

/// Audit trail output
#[derive(Debug, Default, Deserialize)]
pub struct AuditConfig {
    /// File that audit lines are appended to
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

impl StorageConfig {
    /// The document the initial snapshot should be read from, if any.
    pub fn startup_source(&self) -> Option<&Path> {
        if self.resume && self.data.exists() {
            return Some(&self.data);
        }
        self.seed.as_deref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.data, PathBuf::from("data.json"));
        assert!(config.storage.seed.is_none());
        assert!(!config.storage.resume);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.audit.path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            listen = "0.0.0.0"
            port = 8080

            [storage]
            seed = "default.json"
            data = "/var/lib/homestate/data.json"
            resume = true

            [logging]
            level = "debug"

            [logging.overrides]
            "homestate::api" = "trace"

            [audit]
            path = "user_actions.log"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.seed, Some(PathBuf::from("default.json")));
        assert!(config.storage.resume);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.logging.overrides.get("homestate::api"),
            Some(&LogLevel::Trace)
        );
        assert_eq!(config.audit.path, Some(PathBuf::from("user_actions.log")));
    }

    #[test]
    fn test_partial_server_section_keeps_defaults() {
        let config: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_invalid_log_level() {
        let result: Result<Config, _> = toml::from_str("[logging]\nlevel = \"loud\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = Config::from_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_, _))));

        let bad_path = temp_dir.path().join("bad.toml");
        std::fs::write(&bad_path, "[server\n").unwrap();
        assert!(matches!(
            Config::from_file(&bad_path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_startup_source() {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data.json");
        let mut storage = StorageConfig {
            seed: Some(PathBuf::from("default.json")),
            data: data.clone(),
            resume: true,
        };

        // Nothing saved yet, fall back to the seed
        assert_eq!(storage.startup_source(), Some(Path::new("default.json")));

        std::fs::write(&data, "{}").unwrap();
        assert_eq!(storage.startup_source(), Some(data.as_path()));

        storage.resume = false;
        assert_eq!(storage.startup_source(), Some(Path::new("default.json")));

        storage.seed = None;
        assert_eq!(storage.startup_source(), None);
    }
}
