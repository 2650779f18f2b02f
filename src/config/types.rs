//! Configuration Types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::observer::CaptureFormat;
use crate::relay::DEFAULT_BUFFER_SIZE;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

/// Listener and remote endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_host: String,
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
    pub buffer_size: usize,
}

/// Where relay events go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Human readable lines through the tracing subscriber
    #[default]
    Log,
    /// One JSON object per event on stdout
    Json,
}

/// Logging and event rendering
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub capture: CaptureFormat,
    pub output: OutputMode,
    #[serde(with = "humantime_serde")]
    pub summary_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            local_port: 0,
            remote_host: String::new(),
            remote_port: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            capture: CaptureFormat::Text,
            output: OutputMode::Log,
            summary_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// `host:port` of the remote endpoint
    pub fn remote_addr(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_port)
    }
}
