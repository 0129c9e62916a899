//! Votectl Configuration
//!
//! This module provides configuration structures for the votectl
//! administrative client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main votectl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VotectlConfig {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Persisted session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, including the `/api/v1` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Persisted session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the session database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8081/api/v1".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".votectl")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

impl VotectlConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: VotectlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(crate::Error::Config("api.base_url cannot be empty".into()));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(crate::Error::Config(format!(
                "api.base_url must be an http(s) URL, got {}",
                base_url
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(crate::Error::Config("api.request_timeout_secs must be positive".into()));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(crate::Error::Config(format!(
                "logging.level must be one of {:?}",
                LOG_LEVELS
            )));
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(crate::Error::Config(format!(
                "logging.format must be one of {:?}",
                LOG_FORMATS
            )));
        }

        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.api.connect_timeout_secs)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Render the configuration as TOML (used by `votectl init`)
    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Internal(e.to_string()))
    }
}
