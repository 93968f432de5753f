//! Configuration and constants for the profiler and the CLI.

use crate::utils::error::TraceError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Event interface version accepted at library init
pub const SUPPORTED_INTERFACE_VERSION: u64 = 20150628;

/// Rank whose tree shape is canonical during reduction
pub const AUTHORITY_RANK: usize = 0;

/// Frames and allocations below this share of the total are not printed
pub const DEFAULT_PRINT_THRESHOLD_PERCENT: f64 = 0.1;

/// Current event trace schema version
pub const TRACE_SCHEMA_VERSION: &str = "1.0.0";

/// Environment variable naming a report configuration file
pub const CONFIG_ENV_VAR: &str = "SPACE_TIME_STACK_CONFIG";

/// Report rendering options
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Minimum percentage of the total for a line to be printed
    pub threshold_percent: f64,

    /// Label used in the BEGIN/END report banners
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_PRINT_THRESHOLD_PERCENT,
            title: "PROFILING REPORT".to_string(),
        }
    }
}

impl ReportConfig {
    /// Load a report configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a report configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, TraceError> {
        let config: ReportConfig = toml::from_str(content)?;
        if !config.threshold_percent.is_finite() || config.threshold_percent < 0.0 {
            return Err(TraceError::InvalidFormat(format!(
                "threshold_percent must be a non-negative number, got {}",
                config.threshold_percent
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.threshold_percent, 0.1);
        assert_eq!(config.title, "PROFILING REPORT");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ReportConfig::from_toml("threshold_percent = 1.5").unwrap();
        assert_eq!(config.threshold_percent, 1.5);
        assert_eq!(config.title, "PROFILING REPORT");
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(ReportConfig::from_toml("threshold_percent = -1.0").is_err());
    }
}
