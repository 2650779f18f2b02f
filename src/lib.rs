//! tcpwatch Library
//!
//! Transparent TCP relay that forwards a local port to a fixed remote endpoint
//! and reports every connection's lifecycle and every captured chunk to an
//! observer.

pub mod config;
pub mod observer;
pub mod relay;
pub mod reporter;
pub mod shutdown;

pub use config::Config;
pub use observer::{RelayEvent, RelayObserver};
pub use relay::{Direction, RelayEngine, RelayState, SessionId, SessionState};
pub use reporter::SummaryReporter;

/// Common error type for the relay
pub type Result<T> = anyhow::Result<T>;
