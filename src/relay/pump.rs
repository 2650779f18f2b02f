//! Directional Pump
//!
//! Copies bytes one way between the two sockets of a session, reporting each
//! chunk before it is forwarded.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::debug;

use super::session::{Direction, SessionId};
use super::state::RelayState;

/// Read buffer size used when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Shared close flag for the two pumps of one session.
///
/// Whichever pump stops first flips it; the other pump abandons its pending
/// read or write and exits, dropping its socket halves.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CloseHandle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn close(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`CloseHandle::close`] has been called on any clone
    pub async fn closed(&mut self) {
        while !*self.rx.borrow_and_update() {
            // The sender is owned by every clone, so this cannot fail while we exist
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CloseHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a pump stopped
#[derive(Debug)]
pub enum PumpExit {
    /// Source reached end of stream
    Eof,
    ReadFailed(io::Error),
    WriteFailed(io::Error),
    /// The other pump of the session closed it first
    Closed,
}

/// Copies bytes from one socket of a session to the other
pub struct Pump {
    session_id: SessionId,
    direction: Direction,
    announces_closure: bool,
    buffer_size: usize,
    state: Arc<RelayState>,
    close: CloseHandle,
}

impl Pump {
    pub fn new(
        session_id: SessionId,
        direction: Direction,
        state: Arc<RelayState>,
        close: CloseHandle,
    ) -> Self {
        Self {
            session_id,
            direction,
            announces_closure: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            state,
            close,
        }
    }

    /// Make this pump the one that reports "connection terminated".
    ///
    /// Exactly one pump per session must carry this flag.
    pub fn announces_closure(mut self, announces: bool) -> Self {
        self.announces_closure = announces;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_announcing(&self) -> bool {
        self.announces_closure
    }

    /// Run until the source or destination fails, or the session is closed
    pub async fn run<R, W>(mut self, mut source: R, mut destination: W) -> PumpExit
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; self.buffer_size];

        let exit = loop {
            let read = tokio::select! {
                biased;
                _ = self.close.closed() => break PumpExit::Closed,
                read = source.read(&mut buf) => read,
            };

            let n = match read {
                Ok(0) => break PumpExit::Eof,
                Ok(n) => n,
                Err(e) => break PumpExit::ReadFailed(e),
            };

            self.state.capture(self.session_id, self.direction, &buf[..n]);

            let written = tokio::select! {
                biased;
                _ = self.close.closed() => break PumpExit::Closed,
                written = destination.write_all(&buf[..n]) => written,
            };
            if let Err(e) = written {
                break PumpExit::WriteFailed(e);
            }
        };

        self.finish(&exit);
        exit
    }

    fn finish(&self, exit: &PumpExit) {
        self.close.close();

        match exit {
            PumpExit::Eof => debug!(session_id = %self.session_id, direction = %self.direction, "Source closed"),
            PumpExit::ReadFailed(e) => debug!(session_id = %self.session_id, direction = %self.direction, error = %e, "Read failed"),
            PumpExit::WriteFailed(e) => debug!(session_id = %self.session_id, direction = %self.direction, error = %e, "Write failed"),
            PumpExit::Closed => debug!(session_id = %self.session_id, direction = %self.direction, "Closed by peer pump"),
        }

        self.state.close_session(self.session_id);

        if self.announces_closure {
            self.state.log(&format!("Connection {} terminated", self.session_id));
        }
    }
}
