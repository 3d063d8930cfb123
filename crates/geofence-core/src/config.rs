//! Configuration loading and typed config structures for the geofence
//! monitor.
//!
//! The configuration lives in `geofence-config.yaml`. Every section is
//! optional; missing values fall back to the defaults documented on each
//! field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::driver::DriverOptions;
use crate::source::WatchOptions;

/// Environment variable overriding `areas.path`.
pub const ENV_AREAS_PATH: &str = "GEOFENCE_AREAS_PATH";

/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "GEOFENCE_LOG_LEVEL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    /// Options passed to position sources.
    #[serde(default)]
    pub source: SourceConfig,

    /// Location stream driver behavior.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Where areas come from and how often they are reloaded.
    #[serde(default)]
    pub areas: AreasConfig,

    /// Recorded tracks to replay, one subject per track.
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MonitorConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `GEOFENCE_AREAS_PATH` overrides `areas.path`
    /// - `GEOFENCE_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_AREAS_PATH) {
            self.areas.path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
    }

    /// Source options as the driver consumes them.
    pub const fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            high_accuracy: self.source.high_accuracy,
            timeout: Duration::from_millis(self.source.timeout_ms),
            maximum_age: Duration::from_millis(self.source.maximum_age_ms),
        }
    }

    /// Driver options; a zero resubscribe delay means go idle.
    pub const fn driver_options(&self) -> DriverOptions {
        let resubscribe_delay = if self.driver.resubscribe_delay_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.driver.resubscribe_delay_ms))
        };
        DriverOptions {
            watch: self.watch_options(),
            resubscribe_delay,
        }
    }

    /// Area refresh period, or `None` to load once.
    pub const fn refresh_interval(&self) -> Option<Duration> {
        if self.areas.refresh_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.areas.refresh_interval_secs))
        }
    }
}

/// Position source options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Request the most accurate positioning mode.
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,

    /// Milliseconds a single request may take.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum age in milliseconds of a cached sample the source may return.
    #[serde(default)]
    pub maximum_age_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            high_accuracy: default_high_accuracy(),
            timeout_ms: default_timeout_ms(),
            maximum_age_ms: 0,
        }
    }
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    /// Milliseconds to wait before re-subscribing to an ended stream.
    /// Zero disables re-subscription.
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
        }
    }
}

/// Area source settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AreasConfig {
    /// YAML or JSON file holding the area list.
    #[serde(default = "default_areas_path")]
    pub path: PathBuf,

    /// Seconds between reloads. Zero loads once at startup.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

impl Default for AreasConfig {
    fn default() -> Self {
        Self {
            path: default_areas_path(),
            refresh_interval_secs: 0,
        }
    }
}

/// A recorded track replayed as one subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackConfig {
    /// JSON-lines file of raw samples.
    pub path: PathBuf,

    /// Milliseconds between replayed samples.
    #[serde(default = "default_track_interval_ms")]
    pub interval_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_high_accuracy() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_resubscribe_delay_ms() -> u64 {
    5_000
}

fn default_areas_path() -> PathBuf {
    PathBuf::from("areas.yaml")
}

const fn default_track_interval_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
