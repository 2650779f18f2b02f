//! Data Relay Module
//!
//! Accepts inbound connections, dials the remote endpoint and pumps bytes in
//! both directions while reporting to an observer.

pub mod engine;
pub mod pump;
pub mod session;
pub mod state;

pub use engine::{begin, RelayEngine};
pub use pump::{CloseHandle, Pump, PumpExit, DEFAULT_BUFFER_SIZE};
pub use session::{Direction, Session, SessionId, SessionState};
pub use state::{RelayState, RelaySummary};
