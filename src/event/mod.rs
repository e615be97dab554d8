//! Append-only review event log.
//!
//! Every write that changes derived state (ratings, counts, leaderboard
//! scores) commits a [`ReviewEvent`] in the same batch as the row change.
//! Projections consume the log in sequence order; see [`crate::projection`].

mod record;
mod review_event;

pub use record::{EventRecord, PayloadError, PendingEvent};
pub use review_event::{RestaurantRemoved, ReviewEvent, ReviewRevised, ReviewSubmitted};
