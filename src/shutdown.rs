//! Shutdown Signal Handling
//!
//! The relay has no graceful drain: on SIGINT/SIGTERM the process reports its
//! final summary and exits, which closes every socket at once. This module only
//! turns OS signals into a broadcast that the binary can select on.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::Result;

/// Turns termination signals into a broadcast
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    /// Get a receiver that fires once shutdown is requested
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Request shutdown without waiting for a signal
    pub fn trigger(&self) {
        if self.shutdown_tx.send(()).is_err() {
            warn!("Shutdown requested with no subscribers");
        }
    }

    /// Wait for SIGTERM, SIGINT or Ctrl+C, then broadcast shutdown
    pub async fn listen_for_signals(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, shutting down");
        }

        self.trigger();
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
