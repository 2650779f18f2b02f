//! Shared helpers for relay integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tcpwatch::config::RelayConfig;
use tcpwatch::observer::{ChannelObserver, RelayEvent};
use tcpwatch::relay::{RelayEngine, RelayState, SessionId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

pub const WAIT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub addr: SocketAddr,
    pub state: Arc<RelayState>,
    pub events: UnboundedReceiver<RelayEvent>,
    pub relay: JoinHandle<tcpwatch::Result<()>>,
}

impl Harness {
    /// Start a relay on an ephemeral loopback port pointing at `remote`
    pub async fn start(remote: SocketAddr) -> Self {
        let (observer, events) = ChannelObserver::new();
        let config = RelayConfig {
            bind_host: "127.0.0.1".to_string(),
            remote_host: remote.ip().to_string(),
            remote_port: remote.port(),
            ..RelayConfig::default()
        };
        let engine = RelayEngine::with_observer(config, Arc::new(observer));
        let state = Arc::clone(engine.state());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = tokio::spawn(async move { engine.serve(listener).await });

        Self {
            addr,
            state,
            events,
            relay,
        }
    }

    /// Next event, failing the test if none arrives in time
    pub async fn next_event(&mut self) -> RelayEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for relay event")
            .expect("event channel closed")
    }

    /// Next lifecycle event, skipping data and log events
    pub async fn next_lifecycle(&mut self) -> RelayEvent {
        loop {
            let event = self.next_event().await;
            if event.is_lifecycle() {
                return event;
            }
        }
    }

    /// Wait for the "terminated" message of `id`, returning everything seen on the way
    pub async fn wait_terminated(&mut self, id: SessionId) -> Vec<RelayEvent> {
        let expected = format!("Connection {} terminated", id);
        let mut seen = Vec::new();
        loop {
            let event = self.next_event().await;
            let done = matches!(&event, RelayEvent::Log { message } if *message == expected);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    /// Everything currently queued, after giving stragglers a moment
    pub async fn drain(&mut self) -> Vec<RelayEvent> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Remote endpoint that echoes every connection back
pub async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// An address nothing is listening on
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Assert the lifecycle events of one session form a prefix of
/// `Created, (Connected | Failed), Closed?`
pub fn assert_lifecycle_prefix(events: &[RelayEvent], id: SessionId) {
    let lifecycle: Vec<&RelayEvent> = events
        .iter()
        .filter(|e| e.is_lifecycle() && e.session_id() == Some(id))
        .collect();

    assert!(lifecycle.len() <= 3, "too many lifecycle events: {:?}", lifecycle);
    if let Some(first) = lifecycle.first() {
        assert!(matches!(first, RelayEvent::SessionCreated { .. }), "{:?}", lifecycle);
    }
    if let Some(second) = lifecycle.get(1) {
        assert!(
            matches!(
                second,
                RelayEvent::SessionConnected { .. } | RelayEvent::SessionFailed { .. }
            ),
            "{:?}",
            lifecycle
        );
    }
    if let Some(third) = lifecycle.get(2) {
        assert!(matches!(lifecycle[1], RelayEvent::SessionConnected { .. }), "{:?}", lifecycle);
        assert!(matches!(third, RelayEvent::SessionClosed { .. }), "{:?}", lifecycle);
    }
}
