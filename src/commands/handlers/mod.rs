//! Command handlers, grouped by resource.
//!
//! Each group registers itself on the service through a builder method
//! (`review_commands`, `restaurant_commands`, ...); [`review_service`] wires
//! all of them.

pub mod admins;
pub mod leaderboard;
pub mod restaurants;
pub mod reviews;
pub mod users;

use serde::Deserialize;

use super::Service;
use crate::pipeline::ReviewPipeline;
use crate::ranking::RankingStore;
use crate::store::{EventLog, RecordStore};

/// The backend every handler runs against.
pub type Backend<S, K> = ReviewPipeline<S, K>;

const DEFAULT_PAGE_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

/// `skip`/`limit` listing input, defaulting to the first ten rows.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Paging {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// A service with every command registered.
pub fn review_service<S, K>(pipeline: ReviewPipeline<S, K>) -> Service<Backend<S, K>>
where
    S: RecordStore + EventLog + 'static,
    K: RankingStore + 'static,
{
    Service::new(pipeline)
        .review_commands()
        .restaurant_commands()
        .leaderboard_commands()
        .user_commands()
        .admin_commands()
}
