//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe storage, logging and fan-out settings in one serde struct.
//! - Load from a JSON file or from `FEED_CORE_*` environment variables.
//!
//! # Invariants
//! - Missing fields fall back to defaults.
//! - A loaded config always passes `validate`.

use crate::logging::default_log_level;
use crate::notify::FanoutSettings;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "FEED_CORE_";

/// Configuration for `CoreContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; in-memory when absent.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when absent.
    pub log_dir: Option<PathBuf>,
    /// Prefix for notification links, e.g. `https://feed.example`.
    pub public_base_url: Option<String>,
    pub fanout_workers: usize,
    pub fanout_capacity: u32,
    pub job_deadline_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            public_base_url: None,
            fanout_workers: 2,
            fanout_capacity: 64,
            job_deadline_ms: 5_000,
            shutdown_grace_ms: 2_000,
        }
    }
}

impl CoreConfig {
    /// Reads a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `FEED_CORE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Builds a config from `(name, value)` pairs; unrelated names are ignored.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "DB_PATH" => config.db_path = non_empty(&value).map(PathBuf::from),
                "LOG_LEVEL" => config.log_level = value.trim().to_string(),
                "LOG_DIR" => config.log_dir = non_empty(&value).map(PathBuf::from),
                "PUBLIC_BASE_URL" => config.public_base_url = non_empty(&value),
                "FANOUT_WORKERS" => config.fanout_workers = parse_number(&name, &value)?,
                "FANOUT_CAPACITY" => config.fanout_capacity = parse_number(&name, &value)?,
                "JOB_DEADLINE_MS" => config.job_deadline_ms = parse_number(&name, &value)?,
                "SHUTDOWN_GRACE_MS" => config.shutdown_grace_ms = parse_number(&name, &value)?,
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runtime cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fanout_workers == 0 {
            return Err(invalid("fanout_workers", "0"));
        }
        if self.fanout_capacity == 0 {
            return Err(invalid("fanout_capacity", "0"));
        }
        if self.job_deadline_ms == 0 {
            return Err(invalid("job_deadline_ms", "0"));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(invalid("log_dir", &dir.display().to_string()));
            }
        }
        Ok(())
    }

    pub fn fanout_settings(&self) -> FanoutSettings {
        FanoutSettings {
            workers: self.fanout_workers,
            capacity: self.fanout_capacity,
            job_deadline: Duration::from_millis(self.job_deadline_ms),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidValue {
        key: String,
        value: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid config value for `{key}`: `{value}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = CoreConfig::from_json_str(r#"{"fanout_capacity": 8}"#).unwrap();
        assert_eq!(config.fanout_capacity, 8);
        assert_eq!(config.fanout_workers, CoreConfig::default().fanout_workers);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn json_file_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"db_path": "/tmp/feed.sqlite3", "public_base_url": "https://feed.example"}}"#
        )
        .unwrap();

        let config = CoreConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/feed.sqlite3")));
        assert_eq!(
            config.public_base_url.as_deref(),
            Some("https://feed.example")
        );
    }

    #[test]
    fn env_vars_override_defaults_and_ignore_foreign_names() {
        let config = CoreConfig::from_vars(vec![
            ("FEED_CORE_FANOUT_WORKERS".to_string(), "4".to_string()),
            ("FEED_CORE_JOB_DEADLINE_MS".to_string(), "250".to_string()),
            ("FEED_CORE_DB_PATH".to_string(), "  ".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ])
        .unwrap();
        assert_eq!(config.fanout_workers, 4);
        assert_eq!(config.job_deadline_ms, 250);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CoreConfig::from_vars(vec![(
            "FEED_CORE_FANOUT_CAPACITY".to_string(),
            "lots".to_string(),
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "FEED_CORE_FANOUT_CAPACITY"));

        let err = CoreConfig::from_json_str(r#"{"fanout_workers": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = CoreConfig::from_json_str(r#"{"log_dir": "relative/logs"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
