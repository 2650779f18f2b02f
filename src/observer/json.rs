//! JSON lines sink

use std::io::{self, Write};
use std::sync::Mutex;

use bytes::Bytes;
use tracing::error;

use super::{RelayEvent, RelayObserver};
use crate::relay::{Direction, SessionId};

/// Observer that writes one JSON object per notification
pub struct JsonObserver {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonObserver {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out: Mutex::new(out) }
    }

    /// Write events to the process stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn emit(&self, event: RelayEvent) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let result = serde_json::to_writer(&mut *out, &event)
            .map_err(io::Error::from)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush());

        if let Err(e) = result {
            error!("Failed to write relay event: {}", e);
        }
    }
}

impl RelayObserver for JsonObserver {
    fn session_created(&self, id: SessionId) {
        self.emit(RelayEvent::SessionCreated { id });
    }

    fn session_connected(&self, id: SessionId) {
        self.emit(RelayEvent::SessionConnected { id });
    }

    fn session_failed(&self, id: SessionId, error: &io::Error) {
        self.emit(RelayEvent::SessionFailed {
            id,
            error: error.to_string(),
        });
    }

    fn session_closed(&self, id: SessionId) {
        self.emit(RelayEvent::SessionClosed { id });
    }

    fn data_captured(&self, id: SessionId, direction: Direction, data: &[u8]) {
        self.emit(RelayEvent::DataCaptured {
            id,
            direction,
            data: Bytes::copy_from_slice(data),
        });
    }

    fn log(&self, message: &str) {
        self.emit(RelayEvent::Log {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_one_line_per_event() {
        let buf = SharedBuf::default();
        let observer = JsonObserver::new(Box::new(buf.clone()));

        observer.session_created(SessionId(0));
        observer.data_captured(SessionId(0), Direction::ClientToServer, b"hi");
        observer.session_failed(
            SessionId(1),
            &io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"event":"session_created","id":0}"#);
        assert_eq!(
            lines[1],
            r#"{"event":"data_captured","id":0,"direction":"client_to_server","data":"aGk="}"#
        );
        assert_eq!(lines[2], r#"{"event":"session_failed","id":1,"error":"refused"}"#);
    }
}
