//! Background thread that keeps projections caught up with the event log.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use super::ProjectionRunner;
use crate::store::{EventLog, RecordStore};

/// Statistics from the projection worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub polls: usize,
    pub events_applied: usize,
    pub failures: usize,
}

/// Polls [`ProjectionRunner::catch_up`] until stopped.
///
/// ```ignore
/// let worker = ProjectionWorker::spawn(runner.clone(), Duration::from_millis(500));
/// // ...
/// let stats = worker.stop();
/// ```
pub struct ProjectionWorker {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl ProjectionWorker {
    pub fn spawn<S>(runner: Arc<ProjectionRunner<S>>, poll_interval: Duration) -> Self
    where
        S: RecordStore + EventLog + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = WorkerStats::default();
            info!(interval_ms = poll_interval.as_millis() as u64, "projection worker started");

            loop {
                stats.polls += 1;
                let report = runner.catch_up();
                stats.events_applied += report.applied;
                if !report.is_clean() {
                    stats.failures += report.failures.len();
                    warn!(failures = report.failures.len(), "projections behind the log");
                }

                match stop_rx.recv_timeout(poll_interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }

            info!(polls = stats.polls, applied = stats.events_applied, "projection worker stopped");
            stats
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the worker to stop and wait for it. Returns its statistics.
    pub fn stop(mut self) -> WorkerStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => WorkerStats::default(),
        }
    }
}

impl Drop for ProjectionWorker {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::event::{RestaurantRemoved, ReviewEvent};
    use crate::projection::{LeaderboardProjection, ProjectionRunner};
    use crate::ranking::InMemoryRankingStore;
    use crate::store::{Batch, InMemoryRecordStore};

    #[test]
    fn worker_drains_the_log_and_reports() {
        let store = Arc::new(InMemoryRecordStore::new());
        let ranking = Arc::new(InMemoryRankingStore::new());
        let runner = Arc::new(
            ProjectionRunner::new(store.clone())
                .with_projector(LeaderboardProjection::new(ranking, false)),
        );

        let event = ReviewEvent::RestaurantRemoved(RestaurantRemoved { restaurant_id: 1 });
        store
            .commit(Batch::new().event(event.to_pending().unwrap()))
            .unwrap();

        let worker = ProjectionWorker::spawn(runner.clone(), Duration::from_millis(10));
        let deadline = Instant::now() + Duration::from_secs(5);
        while store.checkpoint(LeaderboardProjection::<InMemoryRankingStore>::NAME).unwrap() < 1 {
            assert!(Instant::now() < deadline, "worker never caught up");
            thread::sleep(Duration::from_millis(5));
        }

        let stats = worker.stop();
        assert!(stats.polls >= 1);
        assert_eq!(stats.events_applied, 1);
        assert_eq!(stats.failures, 0);
    }
}
