//! Log sink
//!
//! Renders relay notifications through `tracing`, one line per event.

use std::io;

use tracing::{info, warn};

use super::format::{hex_dump, render_text, CaptureFormat};
use super::RelayObserver;
use crate::relay::{Direction, SessionId};

/// Observer that writes every notification to the tracing subscriber
#[derive(Debug, Clone, Default)]
pub struct LogObserver {
    capture: CaptureFormat,
}

impl LogObserver {
    pub fn new(capture: CaptureFormat) -> Self {
        Self { capture }
    }

    pub fn capture_format(&self) -> CaptureFormat {
        self.capture
    }
}

impl RelayObserver for LogObserver {
    fn session_created(&self, id: SessionId) {
        info!(session_id = %id, "Connection {} (pending)", id);
    }

    fn session_connected(&self, id: SessionId) {
        info!(session_id = %id, "Connection {} (connected)", id);
    }

    fn session_failed(&self, id: SessionId, error: &io::Error) {
        warn!(session_id = %id, error = %error, "Connection {} (failed)", id);
    }

    fn session_closed(&self, id: SessionId) {
        info!(session_id = %id, "Connection {} (disconnected)", id);
    }

    fn data_captured(&self, id: SessionId, direction: Direction, data: &[u8]) {
        let arrow = if direction.is_client() { ">>" } else { "<<" };

        if self.capture.shows_text() {
            info!(
                session_id = %id,
                direction = %direction,
                bytes = data.len(),
                "[{}] {} {}",
                id,
                arrow,
                render_text(data)
            );
        }
        if self.capture.shows_hex() {
            info!(
                session_id = %id,
                direction = %direction,
                bytes = data.len(),
                "[{}] {} {}",
                id,
                arrow,
                hex_dump(data)
            );
        }
        if self.capture == CaptureFormat::None {
            info!(
                session_id = %id,
                direction = %direction,
                bytes = data.len(),
                "[{}] {} {} bytes",
                id,
                arrow,
                data.len()
            );
        }
    }

    fn log(&self, message: &str) {
        info!("{}", message);
    }
}
