//! Configuration management for feature-stats
//!
//! TOML configuration file support, environment variable overrides and
//! sensible defaults.
//!
//! ```toml
//! [dataset]
//! name = "Counties"
//! source = "data/counties.json"
//!
//! [query]
//! group_separator = ", "
//! max_result_records = 10000
//!
//! [monitoring]
//! log_level = "info"
//! metrics_enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Dataset location
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Query and presentation settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Monitoring and observability
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Dataset configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// Display name override; the schema's own name is used when empty
    #[serde(default)]
    pub name: String,

    /// Path to a JSON dataset document
    #[serde(default)]
    pub source: Option<PathBuf>,
}

/// Query configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Separator between group values in result labels
    #[serde(default = "default_group_separator")]
    pub group_separator: String,

    /// Maximum groups a query may return (0 = unlimited)
    #[serde(default = "default_max_result_records")]
    pub max_result_records: usize,
}

/// Monitoring configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics output
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

// Default value functions
fn default_group_separator() -> String { ", ".to_string() }
fn default_max_result_records() -> usize { 10_000 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            group_separator: default_group_separator(),
            max_result_records: default_max_result_records(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Dataset
        if let Ok(name) = std::env::var("FSTATS_DATASET_NAME") {
            self.dataset.name = name;
        }
        if let Ok(source) = std::env::var("FSTATS_DATASET") {
            self.dataset.source = Some(PathBuf::from(source));
        }

        // Query
        if let Ok(separator) = std::env::var("FSTATS_GROUP_SEPARATOR") {
            self.query.group_separator = separator;
        }
        if let Ok(limit) = std::env::var("FSTATS_MAX_RESULT_RECORDS") {
            if let Ok(l) = limit.parse() {
                self.query.max_result_records = l;
            }
        }

        // Monitoring
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.monitoring.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.query.group_separator.is_empty() {
            return Err(Error::Configuration(
                "Group separator cannot be empty".to_string(),
            ));
        }

        if let Some(source) = &self.dataset.source {
            if source.as_os_str().is_empty() {
                return Err(Error::Configuration(
                    "Dataset source path cannot be empty".to_string(),
                ));
            }
        }

        if self.monitoring.log_level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Result limit, `None` when unlimited
    pub fn result_limit(&self) -> Option<usize> {
        (self.query.max_result_records > 0).then_some(self.query.max_result_records)
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }
}
