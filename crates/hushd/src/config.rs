//! Daemon configuration.
//!
//! Configuration for hushd, including:
//! - Alertmanager connection settings
//! - Reconciliation timing
//! - Worker pool sizing
//! - The silence manifest directory

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Main daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Base URL of the Alertmanager API, e.g. `http://localhost:9093`.
    pub alertmanager_url: String,
    /// Directory holding silence manifest files.
    pub manifest_dir: PathBuf,
    /// Interval between steady-state reconciliations in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Lifetime of each created silence in seconds.
    #[serde(default = "default_silence_duration_secs")]
    pub silence_duration_secs: u64,
    /// Creator string recorded on backend silences.
    #[serde(default = "default_author")]
    pub author: String,
    /// Instance name appended to silence comments.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    /// Number of reconcile workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Delay before retrying a failed reconciliation, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_silence_duration_secs() -> u64 {
    3600
}

fn default_author() -> String {
    "hushd".to_string()
}

fn default_instance_name() -> String {
    "hushd".to_string()
}

fn default_concurrency() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    10
}

impl DaemonConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DaemonError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(content: &str) -> Result<Self, DaemonError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| DaemonError::Config(format!("invalid JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.alertmanager_url.is_empty() {
            return Err(DaemonError::Config(
                "alertmanager_url cannot be empty".to_string(),
            ));
        }

        if !self.alertmanager_url.starts_with("http://")
            && !self.alertmanager_url.starts_with("https://")
        {
            return Err(DaemonError::Config(
                "alertmanager_url must start with http:// or https://".to_string(),
            ));
        }

        if self.interval_secs == 0 {
            return Err(DaemonError::Config(
                "interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.silence_duration_secs == 0 {
            return Err(DaemonError::Config(
                "silence_duration_secs must be greater than 0".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(DaemonError::Config(
                "concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// A sample configuration suitable for `init-config`.
    #[must_use]
    pub fn sample() -> Self {
        Self {
            alertmanager_url: "http://localhost:9093".to_string(),
            manifest_dir: PathBuf::from("/etc/hushd/silences"),
            interval_secs: default_interval_secs(),
            silence_duration_secs: default_silence_duration_secs(),
            author: default_author(),
            instance_name: default_instance_name(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}
