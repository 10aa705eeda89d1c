//! Configuration and constants for log analysis.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current JSON report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Default slow threshold in seconds
pub const DEFAULT_SLOW_THRESHOLD_SECS: f64 = 0.05;

/// HTTP status hundred-buckets offered by the filter
pub const STATUS_BUCKETS: &[u16] = &[100, 200, 300, 400, 500];

/// Columns a tab counts for when measuring profile indentation
pub const TAB_WIDTH: usize = 4;

// Component names that identify the two profiling sub-grammars
pub const MIDDLEWARE_COMPONENT: &str = "RequestResponseLoggingMiddleware";
pub const PROFILER_COMPONENT: &str = "Profiling.ProfileService";

// Protocol marker tokens
pub const SIGNALR_MARKER: &str = "[SignalR]";
pub const HUB_MARKER: &str = "WebScapeHub";

// Block markers
pub const EXECUTION_PROFILE_MARKER: &str = "Execution profile:";
pub const END_RESPONSE_MARKER: &str = "End Http Response";

/// Settings loaded from an optional TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub filter: FilterSettings,
}

/// Statistics settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisSettings {
    /// A request at or above this many seconds counts as slow
    #[serde(default = "default_slow_threshold")]
    pub slow_threshold_secs: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            slow_threshold_secs: DEFAULT_SLOW_THRESHOLD_SECS,
        }
    }
}

/// Filter defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterSettings {
    /// Status buckets enabled when none are given on the command line
    #[serde(default)]
    pub status_buckets: Vec<u16>,
}

fn default_slow_threshold() -> f64 {
    DEFAULT_SLOW_THRESHOLD_SECS
}

impl AnalysisConfig {
    /// Parse and validate a config from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.analysis.slow_threshold_secs;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "slow_threshold_secs must be a non-negative number, got {}",
                threshold
            )));
        }

        for bucket in &self.filter.status_buckets {
            validate_status_bucket(*bucket)?;
        }

        Ok(())
    }
}

/// Check that a status bucket is one of the hundred-buckets we filter by
pub fn validate_status_bucket(bucket: u16) -> Result<(), ConfigError> {
    if STATUS_BUCKETS.contains(&bucket) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(format!(
            "status bucket {} is not one of {:?}",
            bucket, STATUS_BUCKETS
        )))
    }
}

/// Load analysis settings from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
/// * `ConfigError::InvalidValue` - If a value is out of range
///
/// # Example
/// ```ignore
/// let config = load_config("logtrace.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    AnalysisConfig::from_toml_str(&contents)
}
