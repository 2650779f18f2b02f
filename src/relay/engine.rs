//! Relay Engine

use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use super::pump::{CloseHandle, Pump};
use super::session::{Direction, SessionId};
use super::state::RelayState;
use crate::config::RelayConfig;
use crate::observer::RelayObserver;
use crate::Result;

/// Accepts inbound connections and relays each one to the remote endpoint
pub struct RelayEngine {
    config: RelayConfig,
    state: Arc<RelayState>,
}

impl RelayEngine {
    /// Create a new relay engine reporting into `state`
    pub fn new(config: RelayConfig, state: Arc<RelayState>) -> Self {
        Self { config, state }
    }

    /// Create a relay engine with a fresh state around `observer`
    pub fn with_observer(config: RelayConfig, observer: Arc<dyn RelayObserver>) -> Self {
        Self::new(config, Arc::new(RelayState::new(observer)))
    }

    pub fn state(&self) -> &Arc<RelayState> {
        &self.state
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Bind the local listening socket
    pub async fn bind(&self) -> Result<TcpListener> {
        let bind_addr = (self.config.bind_host.as_str(), self.config.local_port);

        info!("Binding TCP listener to {}:{}", bind_addr.0, bind_addr.1);
        let listener = TcpListener::bind(bind_addr).await.with_context(|| {
            format!(
                "Failed to listen on {}:{}",
                self.config.bind_host, self.config.local_port
            )
        })?;

        Ok(listener)
    }

    /// Bind and run the accept loop until it fails
    pub async fn begin(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Run the accept loop on an already bound listener.
    ///
    /// Only returns on an accept error; the listener is unusable after that.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener
            .local_addr()
            .context("Failed to read listener address")?;

        self.state
            .log(&format!("Listening on port {}...", local_addr.port()));

        loop {
            let (inbound, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept loop on {} failed: {}", local_addr, e);
                    return Err(e).context("Failed to accept inbound connection");
                }
            };

            let id = self.state.create_session(Some(peer_addr));
            debug!(session_id = %id, peer = %peer_addr, "Accepted connection");

            tokio::spawn(setup_connection(
                Arc::clone(&self.state),
                id,
                inbound,
                self.config.remote_host.clone(),
                self.config.remote_port,
                self.config.buffer_size,
            ));
        }
    }
}

/// Dial the remote endpoint for `id` and start both pumps
async fn setup_connection(
    state: Arc<RelayState>,
    id: SessionId,
    inbound: TcpStream,
    remote_host: String,
    remote_port: u16,
    buffer_size: usize,
) {
    state.log(&format!(
        "Accepted connection {}, initiating new connection to {}:{}",
        id, remote_host, remote_port
    ));

    let outbound = match TcpStream::connect((remote_host.as_str(), remote_port)).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(session_id = %id, error = %e, "Failed to connect to {}:{}", remote_host, remote_port);
            state.mark_failed(id, &e);
            state.log(&format!(
                "Failed to connect connection {} to remote host: {}",
                id, e
            ));
            return;
        }
    };

    state.log(&format!(
        "Successful proxy connection to remote host for connection {}",
        id
    ));
    state.mark_connected(id);

    let close = CloseHandle::new();
    let (client_read, client_write) = inbound.into_split();
    let (server_read, server_write) = outbound.into_split();

    let upstream = Pump::new(id, Direction::ClientToServer, Arc::clone(&state), close.clone())
        .announces_closure(true)
        .buffer_size(buffer_size);
    let downstream = Pump::new(id, Direction::ServerToClient, state, close)
        .buffer_size(buffer_size);

    tokio::spawn(upstream.run(client_read, server_write));
    tokio::spawn(downstream.run(server_read, client_write));
}

/// Relay `local_port` to `remote_host:remote_port` on all interfaces
pub async fn begin(
    observer: Arc<dyn RelayObserver>,
    local_port: u16,
    remote_host: &str,
    remote_port: u16,
) -> Result<()> {
    let config = RelayConfig {
        local_port,
        remote_host: remote_host.to_string(),
        remote_port,
        ..RelayConfig::default()
    };
    RelayEngine::with_observer(config, observer).begin().await
}
