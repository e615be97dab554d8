//! Review ingestion and scoring.
//!
//! A submission is validated, classified and committed together with a
//! `ReviewSubmitted` event. The derived state (user review counts, restaurant
//! averages, both ranking tracks) is maintained by projections over the
//! event log, which the pipeline runs right after each commit. A projection
//! that fails does not fail the request; it is retried by
//! [`ReviewPipeline::reconcile`] or the background [`ProjectionWorker`].
//!
//! [`ProjectionWorker`]: crate::projection::ProjectionWorker

mod error;
mod service;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{Role, DEFAULT_DESCRIPTION};
use crate::store::RecordId;

pub use error::ReviewError;
pub use service::ReviewPipeline;

pub const MAX_DESCRIPTION_LEN: usize = 300;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const DEFAULT_TOP_N: usize = 10;

/// A verified caller, as supplied by the authentication gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: RecordId,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

/// A review as submitted. The author comes from the [`Identity`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(default = "default_description")]
    pub description: String,
    pub restaurant_id: RecordId,
}

/// Fields a review's author may change. Sentiment follows the description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub description_max_len: usize,
    /// Re-apply the sentiment delta difference to the rankings when an edit
    /// changes a review's sentiment. Off by default: the rankings keep the
    /// delta from the original submission.
    pub rescore_on_edit: bool,
    pub projection_poll_interval: Duration,
    /// Leaderboard size when a caller does not ask for one.
    pub default_top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            description_max_len: MAX_DESCRIPTION_LEN,
            rescore_on_edit: false,
            projection_poll_interval: Duration::from_millis(500),
            default_top_n: DEFAULT_TOP_N,
        }
    }
}

impl PipelineConfig {
    pub(crate) fn validate_rating(&self, rating: u8) -> Result<(), ReviewError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ReviewError::Validation(format!(
                "rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, rating
            )));
        }
        Ok(())
    }

    pub(crate) fn validate_description(&self, description: &str) -> Result<(), ReviewError> {
        let len = description.chars().count();
        if len > self.description_max_len {
            return Err(ReviewError::Validation(format!(
                "description must be at most {} characters, got {}",
                self.description_max_len, len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        let config = PipelineConfig::default();
        assert!(config.validate_rating(1).is_ok());
        assert!(config.validate_rating(5).is_ok());
        assert!(matches!(config.validate_rating(0), Err(ReviewError::Validation(_))));
        assert!(config.validate_rating(6).is_err());
    }

    #[test]
    fn description_bound_counts_characters() {
        let config = PipelineConfig::default();
        assert!(config.validate_description(&"é".repeat(300)).is_ok());
        assert!(config.validate_description(&"a".repeat(301)).is_err());
        assert!(config.validate_description("").is_ok());
    }

    #[test]
    fn missing_description_uses_default() {
        let review: NewReview =
            serde_json::from_value(serde_json::json!({"rating": 4, "restaurant_id": 7})).unwrap();
        assert_eq!(review.description, DEFAULT_DESCRIPTION);
    }
}
