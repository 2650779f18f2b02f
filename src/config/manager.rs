//! Configuration Manager

use super::{Config, OutputMode};
use crate::observer::CaptureFormat;
use crate::Result;
use anyhow::{bail, Context};
use std::path::Path;
use std::time::Duration;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MIN_BUFFER_SIZE: usize = 1024;
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Load configuration from `TCPWATCH_*` environment variables
    pub fn load_from_env() -> Result<Config> {
        Self::load_from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn load_from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(port) = lookup("TCPWATCH_LOCAL_PORT") {
            config.relay.local_port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid TCPWATCH_LOCAL_PORT: {}", port))?;
        }

        if let Some(host) = lookup("TCPWATCH_REMOTE_HOST") {
            config.relay.remote_host = host;
        }

        if let Some(port) = lookup("TCPWATCH_REMOTE_PORT") {
            config.relay.remote_port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid TCPWATCH_REMOTE_PORT: {}", port))?;
        }

        if let Some(host) = lookup("TCPWATCH_BIND_HOST") {
            config.relay.bind_host = host;
        }

        if let Some(buffer_size) = lookup("TCPWATCH_BUFFER_SIZE") {
            config.relay.buffer_size = buffer_size
                .parse::<usize>()
                .with_context(|| format!("Invalid TCPWATCH_BUFFER_SIZE: {}", buffer_size))?;
        }

        if let Some(level) = lookup("TCPWATCH_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(interval) = lookup("TCPWATCH_SUMMARY_INTERVAL") {
            config.logging.summary_interval = humantime::parse_duration(&interval)
                .with_context(|| format!("Invalid TCPWATCH_SUMMARY_INTERVAL: {}", interval))?;
        }

        Ok(config)
    }
}

/// Values given on the command line; `None` leaves the loaded value alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub local_port: Option<u16>,
    pub remote_host: Option<String>,
    pub remote_port: Option<u16>,
    pub bind_host: Option<String>,
    pub buffer_size: Option<usize>,
    pub capture: Option<CaptureFormat>,
    pub json: bool,
    pub log_level: Option<String>,
    pub summary_interval: Option<Duration>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_relay_config()
            .with_context(|| "Relay configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_relay_config(&self) -> Result<()> {
        if self.relay.local_port == 0 {
            bail!("local port must be between 1 and 65535");
        }

        if self.relay.remote_host.trim().is_empty() {
            bail!("remote host must not be empty");
        }

        if self.relay.remote_port == 0 {
            bail!("remote port must be between 1 and 65535");
        }

        if self.relay.bind_host.trim().is_empty() {
            bail!("bind host must not be empty");
        }

        if self.relay.buffer_size < MIN_BUFFER_SIZE {
            bail!("buffer_size must be at least {} bytes", MIN_BUFFER_SIZE);
        }

        if self.relay.buffer_size > MAX_BUFFER_SIZE {
            bail!("buffer_size cannot exceed 1MB");
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", VALID_LOG_LEVELS.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(&mut self, cli: CliOverrides) {
        if let Some(port) = cli.local_port {
            self.relay.local_port = port;
            tracing::debug!("CLI override: local port set to {}", port);
        }

        if let Some(host) = cli.remote_host {
            tracing::debug!("CLI override: remote host set to {}", host);
            self.relay.remote_host = host;
        }

        if let Some(port) = cli.remote_port {
            self.relay.remote_port = port;
            tracing::debug!("CLI override: remote port set to {}", port);
        }

        if let Some(host) = cli.bind_host {
            tracing::debug!("CLI override: bind host set to {}", host);
            self.relay.bind_host = host;
        }

        if let Some(buffer_size) = cli.buffer_size {
            self.relay.buffer_size = buffer_size;
            tracing::debug!("CLI override: buffer size set to {} bytes", buffer_size);
        }

        if let Some(capture) = cli.capture {
            self.logging.capture = capture;
        }

        if cli.json {
            self.logging.output = OutputMode::Json;
        }

        if let Some(level) = cli.log_level {
            self.logging.level = level;
        }

        if let Some(interval) = cli.summary_interval {
            self.logging.summary_interval = interval;
        }
    }
}
