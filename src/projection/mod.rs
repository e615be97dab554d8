//! Projections - derived state built from the review event log.
//!
//! Each [`Projector`] owns a named checkpoint: the sequence of the last event
//! it applied. The [`ProjectionRunner`] feeds every projector the events past
//! its checkpoint, in order, and advances the checkpoint after each one.
//!
//! A projector returns the relational writes its event produced as a
//! [`Batch`]; the runner appends the checkpoint to that batch and commits it,
//! so relational projections apply each event exactly once. Projections that
//! write to the ranking store do so inside `apply`, before the checkpoint
//! commit; if that commit fails the event is applied again on the next run.
//!
//! ```ignore
//! let runner = ProjectionRunner::new(store.clone())
//!     .with_projector(AggregateProjection::new(store.clone()))
//!     .with_projector(LeaderboardProjection::new(ranking.clone(), false));
//!
//! let report = runner.catch_up();
//! assert!(report.is_clean());
//! ```

mod aggregates;
mod rankings;
mod worker;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use crate::event::{EventRecord, PayloadError, ReviewEvent};
use crate::ranking::RankingError;
use crate::store::{Batch, EventLog, RecordStore, StoreError};

pub use aggregates::AggregateProjection;
pub use rankings::{LeaderboardProjection, SentimentRatingProjection};
pub use worker::{ProjectionWorker, WorkerStats};

/// Events read from the log per round trip.
const READ_BATCH: usize = 128;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Ranking(#[from] RankingError),
    #[error("undecodable event: {0}")]
    Decode(#[from] PayloadError),
}

/// A consumer of review events that maintains one piece of derived state.
pub trait Projector: Send + Sync {
    /// Checkpoint name. Must be stable across restarts.
    fn name(&self) -> &'static str;

    /// Apply one event, returning the relational writes to commit with the
    /// checkpoint. Must tolerate being called again for the same event after
    /// a failed checkpoint commit.
    fn apply(&self, record: &EventRecord, event: &ReviewEvent) -> Result<Batch, ProjectionError>;
}

/// A projector that stopped at an event it could not apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionFailure {
    pub projection: &'static str,
    pub sequence: u64,
    pub error: String,
}

/// Outcome of one [`ProjectionRunner::catch_up`] pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionReport {
    /// Events applied, summed over projectors.
    pub applied: usize,
    pub failures: Vec<ProjectionFailure>,
}

impl ProjectionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: ProjectionReport) {
        self.applied += other.applied;
        self.failures.extend(other.failures);
    }
}

struct Registered {
    projector: Box<dyn Projector>,
    /// Held for a whole drain so two callers never apply the same range.
    gate: Mutex<()>,
}

/// Drives registered projectors over the event log.
pub struct ProjectionRunner<S> {
    store: Arc<S>,
    projectors: Vec<Registered>,
}

impl<S: RecordStore + EventLog> ProjectionRunner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            projectors: Vec::new(),
        }
    }

    pub fn with_projector(mut self, projector: impl Projector + 'static) -> Self {
        self.projectors.push(Registered {
            projector: Box::new(projector),
            gate: Mutex::new(()),
        });
        self
    }

    pub fn projection_names(&self) -> Vec<&'static str> {
        self.projectors.iter().map(|r| r.projector.name()).collect()
    }

    /// Bring every projector up to the head of the log.
    ///
    /// A projector that fails stops at the failing event and is retried from
    /// there on the next call; the others carry on.
    pub fn catch_up(&self) -> ProjectionReport {
        let mut report = ProjectionReport::default();
        for registered in &self.projectors {
            report.merge(self.drain(registered));
        }
        report
    }

    /// Events each projector has yet to apply, by projection name.
    pub fn lag(&self) -> Result<Vec<(&'static str, u64)>, StoreError> {
        let head = self.store.head()?;
        self.projectors
            .iter()
            .map(|r| {
                let name = r.projector.name();
                Ok((name, head.saturating_sub(self.store.checkpoint(name)?)))
            })
            .collect()
    }

    /// Apply events up to the head as it stood when the drain began. Events
    /// appended meanwhile are left to the callers that appended them.
    fn drain(&self, registered: &Registered) -> ProjectionReport {
        let name = registered.projector.name();
        let mut report = ProjectionReport::default();

        let target = match self.store.head() {
            Ok(head) => head,
            Err(err) => return unreadable(name, err, report),
        };

        let _gate = match registered.gate.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        loop {
            let batch = self.store.checkpoint(name).and_then(|after| {
                if after >= target {
                    return Ok(Vec::new());
                }
                let remaining = usize::try_from(target - after).unwrap_or(READ_BATCH);
                self.store.read_after(after, remaining.min(READ_BATCH))
            });
            let records = match batch {
                Ok(records) => records,
                Err(err) => return unreadable(name, err, report),
            };
            if records.is_empty() {
                return report;
            }

            for record in &records {
                if let Err(err) = self.apply_one(registered.projector.as_ref(), record) {
                    warn!(
                        projection = name,
                        sequence = record.sequence,
                        error = %err,
                        "projection stalled"
                    );
                    report.failures.push(ProjectionFailure {
                        projection: name,
                        sequence: record.sequence,
                        error: err.to_string(),
                    });
                    return report;
                }
                report.applied += 1;
            }
        }
    }

    fn apply_one(&self, projector: &dyn Projector, record: &EventRecord) -> Result<(), ProjectionError> {
        let event = ReviewEvent::from_record(record)?;
        let writes = projector.apply(record, &event)?;
        self.store
            .commit(writes.checkpoint(projector.name(), record.sequence))?;
        debug!(
            projection = projector.name(),
            sequence = record.sequence,
            event = record.event_name.as_str(),
            "applied"
        );
        Ok(())
    }
}

fn unreadable(name: &'static str, err: StoreError, mut report: ProjectionReport) -> ProjectionReport {
    warn!(projection = name, error = %err, "cannot read event log");
    report.failures.push(ProjectionFailure {
        projection: name,
        sequence: 0,
        error: err.to_string(),
    });
    report
}
