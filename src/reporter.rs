//! Summary Reporter
//!
//! Periodically logs the relay's running byte counts and session totals.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::relay::{RelayState, RelaySummary};

/// Background task that logs a [`RelaySummary`] on a fixed interval
pub struct SummaryReporter {
    state: Arc<RelayState>,
    interval: Duration,
}

impl SummaryReporter {
    pub fn new(state: Arc<RelayState>, interval: Duration) -> Self {
        Self { state, interval }
    }

    /// Log the current summary once
    pub fn report(&self) -> RelaySummary {
        let summary = self.state.summary();
        info!(
            bytes_sent = summary.bytes_sent,
            bytes_received = summary.bytes_received,
            pending = summary.pending,
            connected = summary.connected,
            closed = summary.closed,
            "Traffic summary: {}",
            summary
        );
        summary
    }

    /// Start reporting in the background.
    ///
    /// A zero interval disables periodic reports and returns `None`.
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        if self.interval.is_zero() {
            debug!("Periodic traffic summary disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // First tick completes immediately
            interval.tick().await;

            let mut last = RelaySummary::default();
            loop {
                interval.tick().await;
                let current = self.state.summary();
                if current != last {
                    self.report();
                    last = current;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::LogObserver;
    use crate::relay::Direction;

    #[tokio::test]
    async fn test_report_reflects_state() {
        let state = Arc::new(RelayState::new(Arc::new(LogObserver::default())));
        let id = state.create_session(None);
        state.mark_connected(id);
        state.capture(id, Direction::ClientToServer, b"ping");

        let reporter = SummaryReporter::new(state, Duration::from_secs(1));
        let summary = reporter.report();
        assert_eq!(summary.bytes_sent, 4);
        assert_eq!(summary.connected, 1);
    }

    #[tokio::test]
    async fn test_zero_interval_disables_task() {
        let state = Arc::new(RelayState::new(Arc::new(LogObserver::default())));
        assert!(SummaryReporter::new(state, Duration::ZERO).spawn().is_none());
    }

    #[tokio::test]
    async fn test_spawned_task_runs_until_aborted() {
        let state = Arc::new(RelayState::new(Arc::new(LogObserver::default())));
        let handle = SummaryReporter::new(state, Duration::from_millis(10))
            .spawn()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
