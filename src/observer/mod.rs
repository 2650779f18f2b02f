//! Relay Observers
//!
//! The relay reports session lifecycle transitions and captured data through
//! the [`RelayObserver`] trait. Sinks in this module render those reports to
//! the log, to JSON lines, or into a channel.

pub mod channel;
pub mod format;
pub mod json;
pub mod log;

use std::io;

use base64::Engine as _;
use bytes::Bytes;
use serde::{Serialize, Serializer};

use crate::relay::{Direction, SessionId};

pub use channel::ChannelObserver;
pub use format::{format_bytes, hex_dump, CaptureFormat};
pub use json::JsonObserver;
pub use log::LogObserver;

/// Receives every notification the relay emits.
///
/// Calls are made while the relay holds its state lock, so implementations
/// must return promptly and must not call back into the relay state.
pub trait RelayObserver: Send + Sync {
    /// A new inbound connection was accepted
    fn session_created(&self, id: SessionId);

    /// The outbound connection for `id` was established
    fn session_connected(&self, id: SessionId);

    /// The outbound dial for `id` failed; the session is now closed
    fn session_failed(&self, id: SessionId, error: &io::Error);

    /// A connected session terminated
    fn session_closed(&self, id: SessionId);

    /// A chunk was read and is about to be forwarded
    fn data_captured(&self, id: SessionId, direction: Direction, data: &[u8]);

    /// Free-form informational message
    fn log(&self, message: &str);
}

/// Owned form of a single observer notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayEvent {
    SessionCreated {
        id: SessionId,
    },
    SessionConnected {
        id: SessionId,
    },
    SessionFailed {
        id: SessionId,
        error: String,
    },
    SessionClosed {
        id: SessionId,
    },
    DataCaptured {
        id: SessionId,
        direction: Direction,
        #[serde(serialize_with = "serialize_base64")]
        data: Bytes,
    },
    Log {
        message: String,
    },
}

impl RelayEvent {
    /// Session the event belongs to, if any
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            RelayEvent::SessionCreated { id }
            | RelayEvent::SessionConnected { id }
            | RelayEvent::SessionFailed { id, .. }
            | RelayEvent::SessionClosed { id }
            | RelayEvent::DataCaptured { id, .. } => Some(*id),
            RelayEvent::Log { .. } => None,
        }
    }

    /// Whether the event moves a session to a new lifecycle state
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, RelayEvent::DataCaptured { .. } | RelayEvent::Log { .. })
    }
}

fn serialize_base64<S>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
}
