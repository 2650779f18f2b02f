//! Shared Relay State
//!
//! Session table and traffic counters for the whole process. Every mutation
//! and every observer notification happens under the same lock, so observers
//! never see interleaved or out-of-order calls for a given session.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, warn};

use super::session::{Direction, Session, SessionId, SessionState};
use crate::observer::{format_bytes, RelayObserver};

/// Point in time view of the relay's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelaySummary {
    /// Bytes captured client to server
    pub bytes_sent: u64,
    /// Bytes captured server to client
    pub bytes_received: u64,
    pub pending: usize,
    pub connected: usize,
    pub closed: usize,
}

impl RelaySummary {
    pub fn total_sessions(&self) -> usize {
        self.pending + self.connected + self.closed
    }
}

impl std::fmt::Display for RelaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "up {} | down {} | {} pending, {} connected, {} closed",
            format_bytes(self.bytes_sent),
            format_bytes(self.bytes_received),
            self.pending,
            self.connected,
            self.closed
        )
    }
}

#[derive(Default)]
struct Inner {
    sessions: Vec<Session>,
    bytes_sent: u64,
    bytes_received: u64,
}

/// Session table, counters and the observer they report to
pub struct RelayState {
    inner: Mutex<Inner>,
    observer: Arc<dyn RelayObserver>,
}

impl RelayState {
    pub fn new(observer: Arc<dyn RelayObserver>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            observer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a new pending session and announce it
    pub fn create_session(&self, peer_addr: Option<SocketAddr>) -> SessionId {
        let mut inner = self.lock();
        let id = SessionId(inner.sessions.len());
        inner.sessions.push(Session::new(id, peer_addr));
        self.observer.session_created(id);
        id
    }

    /// `Pending -> Connected`
    pub fn mark_connected(&self, id: SessionId) -> bool {
        let mut inner = self.lock();
        let Some(session) = inner.sessions.get_mut(id.index()) else {
            warn!(session_id = %id, "Connect reported for unknown session");
            return false;
        };
        if !session.transition(SessionState::Connected) {
            debug!(session_id = %id, state = %session.state(), "Ignoring connect transition");
            return false;
        }
        self.observer.session_connected(id);
        true
    }

    /// `Pending -> Closed` after a failed dial
    pub fn mark_failed(&self, id: SessionId, error: &io::Error) -> bool {
        let mut inner = self.lock();
        let Some(session) = inner.sessions.get_mut(id.index()) else {
            warn!(session_id = %id, "Dial failure reported for unknown session");
            return false;
        };
        if !session.fail(error.to_string()) {
            debug!(session_id = %id, state = %session.state(), "Ignoring dial failure");
            return false;
        }
        self.observer.session_failed(id, error);
        true
    }

    /// `Connected -> Closed`.
    ///
    /// Safe to call from both pumps of a session; only the first call
    /// notifies the observer.
    pub fn close_session(&self, id: SessionId) -> bool {
        let mut inner = self.lock();
        let Some(session) = inner.sessions.get_mut(id.index()) else {
            warn!(session_id = %id, "Close reported for unknown session");
            return false;
        };
        if !session.transition(SessionState::Closed) {
            return false;
        }
        self.observer.session_closed(id);
        true
    }

    /// Account for and report one captured chunk
    pub fn capture(&self, id: SessionId, direction: Direction, data: &[u8]) {
        let mut inner = self.lock();
        let len = data.len() as u64;
        match direction {
            Direction::ClientToServer => inner.bytes_sent += len,
            Direction::ServerToClient => inner.bytes_received += len,
        }
        self.observer.data_captured(id, direction, data);
    }

    /// Forward an informational message to the observer
    pub fn log(&self, message: &str) {
        let _inner = self.lock();
        self.observer.log(message);
    }

    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        self.lock().sessions.get(id.index()).map(Session::state)
    }

    /// Copy of one session slot
    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.lock().sessions.get(id.index()).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn bytes_sent(&self) -> u64 {
        self.lock().bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.lock().bytes_received
    }

    pub fn summary(&self) -> RelaySummary {
        let inner = self.lock();
        let mut summary = RelaySummary {
            bytes_sent: inner.bytes_sent,
            bytes_received: inner.bytes_received,
            ..RelaySummary::default()
        };
        for session in &inner.sessions {
            match session.state() {
                SessionState::Pending => summary.pending += 1,
                SessionState::Connected => summary.connected += 1,
                SessionState::Closed => summary.closed += 1,
            }
        }
        summary
    }
}
