//! tcpwatch - transparent TCP relay
//!
//! Forwards a local port to a remote endpoint and shows every connection and
//! every captured chunk as it passes through.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tcpwatch::{
    config::{CliOverrides, Config, ConfigManager, OutputMode},
    observer::{CaptureFormat, JsonObserver, LogObserver, RelayObserver},
    relay::{RelayEngine, RelayState},
    shutdown::ShutdownCoordinator,
    SummaryReporter,
};

/// CLI arguments for tcpwatch
#[derive(Parser, Debug)]
#[command(name = "tcpwatch")]
#[command(about = "Transparent TCP relay that shows every connection and every byte")]
#[command(version)]
#[command(long_about = "
Transparent TCP relay that shows every connection and every byte.

Usage: tcpwatch <local-port> <remote-host> <remote-port>

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables (used when no configuration file exists):
  TCPWATCH_LOCAL_PORT        - Local port to listen on
  TCPWATCH_REMOTE_HOST       - Remote host to relay to
  TCPWATCH_REMOTE_PORT       - Remote port to relay to
  TCPWATCH_BIND_HOST         - Local interface to bind (default 0.0.0.0)
  TCPWATCH_BUFFER_SIZE       - Read buffer size in bytes
  TCPWATCH_LOG_LEVEL         - Log level (trace, debug, info, warn, error)
  TCPWATCH_SUMMARY_INTERVAL  - Traffic summary interval (e.g. 30s, 0s to disable)
")]
pub struct CliArgs {
    /// Local port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub local_port: Option<u16>,

    /// Remote host to relay to
    pub remote_host: Option<String>,

    /// Remote port to relay to
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub remote_port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "tcpwatch.toml")]
    pub config: PathBuf,

    /// Local interface to bind
    #[arg(short, long)]
    pub bind_host: Option<String>,

    /// Read buffer size in bytes
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// How captured data is shown (none, text, hex, both)
    #[arg(long)]
    pub capture: Option<CaptureFormat>,

    /// Print relay events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Interval between traffic summaries (e.g. 10s, 1m, 0s to disable)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub summary_interval: Option<Duration>,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate_config: bool,
}

impl CliArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            local_port: self.local_port,
            remote_host: self.remote_host.clone(),
            remote_port: self.remote_port,
            bind_host: self.bind_host.clone(),
            buffer_size: self.buffer_size,
            capture: self.capture,
            json: self.json,
            log_level: self.log_level.clone(),
            summary_interval: self.summary_interval,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };
    config.merge_with_cli_args(args.overrides());

    init_tracing(&args, &config)?;

    config
        .validate()
        .context("Configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Listen: {}:{}", config.relay.bind_host, config.relay.local_port);
        info!("  Remote: {}", config.relay.remote_addr());
        info!("  Buffer size: {} bytes", config.relay.buffer_size);
        return Ok(());
    }

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    info!(
        "Starting tcpwatch v{}: port {} -> {}",
        env!("CARGO_PKG_VERSION"),
        config.relay.local_port,
        config.relay.remote_addr()
    );

    let observer: Arc<dyn RelayObserver> = match config.logging.output {
        OutputMode::Log => Arc::new(LogObserver::new(config.logging.capture)),
        OutputMode::Json => Arc::new(JsonObserver::stdout()),
    };
    let state = Arc::new(RelayState::new(observer));

    let reporter =
        SummaryReporter::new(Arc::clone(&state), config.logging.summary_interval).spawn();

    let engine = RelayEngine::new(config.relay, Arc::clone(&state));
    let shutdown = ShutdownCoordinator::new();

    let result = tokio::select! {
        result = engine.begin() => {
            if let Err(e) = &result {
                error!("Relay stopped: {:#}", e);
            }
            result
        }
        signal = shutdown.listen_for_signals() => signal,
    };

    if let Some(handle) = reporter {
        handle.abort();
    }
    SummaryReporter::new(state, Duration::ZERO).report();

    result
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, config: &Config) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // JSON events own stdout, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
