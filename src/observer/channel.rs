//! Channel sink
//!
//! Turns observer calls into owned [`RelayEvent`]s on an unbounded channel so
//! the relay can be embedded and driven from async code.

use std::io;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{RelayEvent, RelayObserver};
use crate::relay::{Direction, SessionId};

/// Observer that forwards every notification into a channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RelayEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its event channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Same as [`ChannelObserver::new`] but hands back a `Stream` of events
    pub fn with_stream() -> (Self, UnboundedReceiverStream<RelayEvent>) {
        let (observer, rx) = Self::new();
        (observer, UnboundedReceiverStream::new(rx))
    }

    fn send(&self, event: RelayEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl RelayObserver for ChannelObserver {
    fn session_created(&self, id: SessionId) {
        self.send(RelayEvent::SessionCreated { id });
    }

    fn session_connected(&self, id: SessionId) {
        self.send(RelayEvent::SessionConnected { id });
    }

    fn session_failed(&self, id: SessionId, error: &io::Error) {
        self.send(RelayEvent::SessionFailed {
            id,
            error: error.to_string(),
        });
    }

    fn session_closed(&self, id: SessionId) {
        self.send(RelayEvent::SessionClosed { id });
    }

    fn data_captured(&self, id: SessionId, direction: Direction, data: &[u8]) {
        self.send(RelayEvent::DataCaptured {
            id,
            direction,
            data: Bytes::copy_from_slice(data),
        });
    }

    fn log(&self, message: &str) {
        self.send(RelayEvent::Log {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_events_arrive_in_call_order() {
        let (observer, events) = ChannelObserver::with_stream();

        observer.session_created(SessionId(0));
        observer.data_captured(SessionId(0), Direction::ServerToClient, &[1, 2, 3]);
        observer.log("hello");
        drop(observer);

        let collected: Vec<RelayEvent> = events.collect().await;
        assert_eq!(
            collected,
            vec![
                RelayEvent::SessionCreated { id: SessionId(0) },
                RelayEvent::DataCaptured {
                    id: SessionId(0),
                    direction: Direction::ServerToClient,
                    data: Bytes::from_static(&[1, 2, 3]),
                },
                RelayEvent::Log {
                    message: "hello".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_send_after_receiver_dropped_is_ignored() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.session_closed(SessionId(5));
    }
}
