//! Relay Session

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Index of a session in the relay's session table.
///
/// Ids are handed out in acceptance order starting at 0 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub usize);

impl SessionId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which way a captured chunk was flowing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Inbound socket to remote endpoint
    ClientToServer,
    /// Remote endpoint to inbound socket
    ServerToClient,
}

impl Direction {
    pub fn is_client(self) -> bool {
        matches!(self, Direction::ClientToServer)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToServer => write!(f, "client->server"),
            Direction::ServerToClient => write!(f, "server->client"),
        }
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Pending,
    Connected,
    Closed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Pending, SessionState::Connected)
                | (SessionState::Pending, SessionState::Closed)
                | (SessionState::Connected, SessionState::Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Pending => write!(f, "pending"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// One slot in the session table
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    peer_addr: Option<SocketAddr>,
    state: SessionState,
    accepted_at: Instant,
    failure: Option<String>,
}

impl Session {
    /// Create a new session in the `Pending` state
    pub fn new(id: SessionId, peer_addr: Option<SocketAddr>) -> Self {
        debug!(session_id = %id, peer = ?peer_addr, "Creating new relay session");

        Self {
            id,
            peer_addr,
            state: SessionState::Pending,
            accepted_at: Instant::now(),
            failure: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Dial error recorded when the session failed before connecting
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Time since the inbound connection was accepted
    pub fn age(&self) -> Duration {
        self.accepted_at.elapsed()
    }

    /// Move to `next` if the transition is legal.
    ///
    /// Returns `false` and leaves the state untouched otherwise, which is what
    /// makes a second close a no-op.
    pub fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    /// Close a pending session because its outbound dial failed
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.state != SessionState::Pending {
            return false;
        }
        self.state = SessionState::Closed;
        self.failure = Some(reason.into());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut session = Session::new(SessionId(0), None);
        assert_eq!(session.state(), SessionState::Pending);

        assert!(session.transition(SessionState::Connected));
        assert!(session.transition(SessionState::Closed));
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_no_backward_or_repeated_transitions() {
        let mut session = Session::new(SessionId(3), None);
        assert!(!session.transition(SessionState::Pending));

        assert!(session.transition(SessionState::Connected));
        assert!(!session.transition(SessionState::Connected));
        assert!(!session.transition(SessionState::Pending));

        assert!(session.transition(SessionState::Closed));
        assert!(!session.transition(SessionState::Closed));
        assert!(!session.transition(SessionState::Connected));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_dial_failure_skips_connected() {
        let mut session = Session::new(SessionId(1), "127.0.0.1:4000".parse().ok());
        assert!(session.fail("connection refused"));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.failure(), Some("connection refused"));

        // Already terminal
        assert!(!session.fail("again"));
        assert!(!session.transition(SessionState::Connected));
        assert_eq!(session.failure(), Some("connection refused"));
    }

    #[test]
    fn test_connected_session_cannot_fail() {
        let mut session = Session::new(SessionId(2), None);
        session.transition(SessionState::Connected);
        assert!(!session.fail("late dial error"));
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.failure().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionId(7).to_string(), "7");
        assert_eq!(Direction::ClientToServer.to_string(), "client->server");
        assert_eq!(SessionState::Connected.to_string(), "connected");
        assert!(Direction::ClientToServer.is_client());
        assert!(!Direction::ServerToClient.is_client());
    }
}
