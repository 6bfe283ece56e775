use crate::{
    cache::policy::{PolicyError, PolicyTable, Ttl},
    middleware::pipeline::{PipelineConfig, DEFAULT_MAX_BATCH_SIZE},
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// One `[[cache.policies]]` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub prefix: String,
    pub ttl: Ttl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    #[serde(default = "default_purge_interval")]
    pub purge_interval_seconds: u64,

    /// Empty means the built-in steemd/appbase table.
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

fn default_memory_capacity() -> usize {
    100_000
}

fn default_purge_interval() -> u64 {
    60
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            memory_capacity: default_memory_capacity(),
            purge_interval_seconds: default_purge_interval(),
            policies: Vec::new(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            upstream_timeout_seconds: default_upstream_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            cache: CacheConfig::default(),
            pipeline: PipelineSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, then applies `RELAY__*` environment overrides.
    ///
    /// A missing file is not an error; compiled defaults fill every gap.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong type.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();

        let settings = Config::builder()
            .set_default("environment", default_environment())?
            .set_default("cache.enabled", default_true())?
            .set_default("cache.memory_capacity", default_memory_capacity() as u64)?
            .set_default("cache.purge_interval_seconds", default_purge_interval())?
            .set_default("pipeline.max_batch_size", default_max_batch_size() as u64)?
            .set_default("pipeline.upstream_timeout_seconds", default_upstream_timeout())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Loads configuration from `RELAY_CONFIG`, falling back to `config/config.toml`.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_file`].
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(config_path)
    }

    /// Checks value ranges and the policy table.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.enabled && self.cache.memory_capacity == 0 {
            return Err("cache.memory_capacity must be greater than 0".to_string());
        }

        if self.cache.purge_interval_seconds == 0 {
            return Err("cache.purge_interval_seconds must be greater than 0".to_string());
        }

        if self.pipeline.max_batch_size == 0 {
            return Err("pipeline.max_batch_size must be greater than 0".to_string());
        }

        if self.pipeline.upstream_timeout_seconds == 0 {
            return Err("pipeline.upstream_timeout_seconds must be greater than 0".to_string());
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }

        self.policy_table().map_err(|e| format!("cache.policies: {e}"))?;

        Ok(())
    }

    /// Builds the TTL policy table from `cache.policies`.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] when the configured entries lack a catch-all or repeat a prefix.
    pub fn policy_table(&self) -> Result<PolicyTable, PolicyError> {
        if self.cache.policies.is_empty() {
            return Ok(PolicyTable::default());
        }
        PolicyTable::from_entries(self.cache.policies.iter().map(|p| (p.prefix.as_str(), p.ttl)))
    }

    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_batch_size: self.pipeline.max_batch_size,
            upstream_timeout: Duration::from_secs(self.pipeline.upstream_timeout_seconds),
            cache_enabled: self.cache.enabled,
        }
    }

    #[must_use]
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.cache.purge_interval_seconds)
    }
}
