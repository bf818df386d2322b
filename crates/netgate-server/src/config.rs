//! Server configuration
//!
//! Loaded from TOML (`--config`, else `netgate.toml` when present, else
//! defaults), then overridden by `NETGATE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "netgate.toml";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`NetgateConfig`]
    #[error("invalid config {path}: {source}")]
    Toml {
        /// File
        path: PathBuf,
        /// Cause
        #[source]
        source: toml::de::Error,
    },

    /// Environment override has a bad value
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },
}

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetgateConfig {
    /// Directory holding the repository state file
    pub state_dir: PathBuf,
    /// Inventory YAML
    pub inventory: Option<PathBuf>,
    /// Health probe budget, in seconds
    pub health_timeout_secs: u64,
    /// Static analysis budget per backend call, in seconds
    pub analysis_timeout_secs: u64,
    /// Log format
    pub log_format: LogFormat,
    /// Extra compliance rulesets (YAML)
    pub rulesets: Vec<PathBuf>,
    /// Vulnerability database (YAML); built-in data when unset
    pub vulnerability_db: Option<PathBuf>,
}

impl Default for NetgateConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".netgate"),
            inventory: None,
            health_timeout_secs: 30,
            analysis_timeout_secs: 30,
            log_format: LogFormat::Text,
            rulesets: Vec::new(),
            vulnerability_db: None,
        }
    }
}

impl NetgateConfig {
    /// Load from `path`, or [`DEFAULT_CONFIG_FILE`] if present, then apply the
    /// process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.with_env(std::env::vars())
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `NETGATE_*` overrides from `vars`
    pub fn with_env<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let value = value.into();
            match key {
                "NETGATE_STATE_DIR" => self.state_dir = PathBuf::from(value),
                "NETGATE_INVENTORY" => self.inventory = Some(PathBuf::from(value)),
                "NETGATE_VULN_DB" => self.vulnerability_db = Some(PathBuf::from(value)),
                "NETGATE_HEALTH_TIMEOUT_SECS" => {
                    self.health_timeout_secs = parse_env(key, &value)?;
                }
                "NETGATE_ANALYSIS_TIMEOUT_SECS" => {
                    self.analysis_timeout_secs = parse_env(key, &value)?;
                }
                "NETGATE_LOG_FORMAT" => self.log_format = parse_env(key, &value)?,
                _ => {}
            }
        }
        Ok(self)
    }

    /// Health probe budget
    #[inline]
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Static analysis budget
    #[inline]
    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: NetgateConfig = toml::from_str("health_timeout_secs = 5\n").unwrap();
        assert_eq!(config.health_timeout(), Duration::from_secs(5));
        assert_eq!(config.analysis_timeout_secs, 30);
        assert_eq!(config.state_dir, PathBuf::from(".netgate"));
    }

    #[test]
    fn env_overrides_file() {
        let config = NetgateConfig::default()
            .with_env([
                ("NETGATE_STATE_DIR", "/var/lib/netgate"),
                ("NETGATE_LOG_FORMAT", "json"),
                ("NETGATE_HEALTH_TIMEOUT_SECS", "12"),
                ("HOME", "/root"),
            ])
            .unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/netgate"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.health_timeout_secs, 12);
    }

    #[test]
    fn bad_env_value() {
        let err = NetgateConfig::default()
            .with_env([("NETGATE_ANALYSIS_TIMEOUT_SECS", "soon")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "NETGATE_ANALYSIS_TIMEOUT_SECS"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = NetgateConfig::load(Some(Path::new("/nonexistent/netgate.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
