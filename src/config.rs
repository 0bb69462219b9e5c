//! Run configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 10;

/// Default interval between monitor diagnostics, in milliseconds.
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 50;

/// Tunables for one preflow run.
///
/// Missing fields in a JSON document fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreflowConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// How often the monitor emits a `trace` diagnostic while polling.
    pub poll_report_interval_ms: u64,
}

impl Default for PreflowConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            poll_report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
        }
    }
}

impl PreflowConfig {
    /// Returns the configuration with the worker count replaced.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Decodes a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and decodes a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects configurations no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(FlowError::NoWorkers);
        }
        Ok(())
    }

    /// The diagnostic interval as a [`Duration`].
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.poll_report_interval_ms)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PreflowConfig::default();
        assert_eq!(config.workers, 10);
        assert_eq!(config.report_interval(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PreflowConfig::from_json_str(r#"{ "workers": 4 }"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.poll_report_interval_ms, DEFAULT_REPORT_INTERVAL_MS);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(matches!(
            PreflowConfig::from_json_str(r#"{ "threads": 4 }"#),
            Err(FlowError::Config(_))
        ));
    }

    #[test]
    fn test_zero_workers_is_invalid() {
        let config = PreflowConfig::default().with_workers(0);
        assert!(matches!(config.validate(), Err(FlowError::NoWorkers)));
    }
}
