//! Ranking store - two derived views over the review stream, keyed by restaurant.
//!
//! - The **momentum leaderboard** is a sorted set whose member
//!   `"{restaurant_id}:{restaurant_name}"` accumulates raw sentiment deltas.
//!   [`RankingStore::top`] reads it.
//! - The **sentiment rating** track is a hash holding `"{id}:score"`,
//!   `"{id}:count"` and `"{id}:name"`. Ratings are derived from it at read
//!   time by [`scale_rating`] and never stored.
//!
//! The two tracks are updated independently and must not be conflated.

mod in_memory;
#[cfg(feature = "redis")]
mod redis;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::RecordId;

pub use in_memory::InMemoryRankingStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisRankingStore;

/// Redis key of the momentum leaderboard sorted set.
pub const LEADERBOARD_KEY: &str = "restaurant_lead";
/// Redis key of the sentiment rating hash.
pub const RATINGS_KEY: &str = "restaurant_leaderboard";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    #[error("ranking store unavailable: {0}")]
    Unavailable(String),
    #[error("ranking store timed out: {0}")]
    Timeout(String),
    #[error("corrupt ranking data: {0}")]
    Corrupt(String),
}

/// One row of the momentum leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// `"{restaurant_id}:{restaurant_name}"`
    pub member: String,
    pub score: i64,
}

impl LeaderboardEntry {
    /// The id prefix of `member`, when it parses.
    pub fn restaurant_id(&self) -> Option<RecordId> {
        self.member.split_once(':')?.0.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRating {
    pub restaurant_id: RecordId,
    pub name: String,
    pub rating: f64,
}

/// Storage for both ranking tracks.
///
/// Every operation on a single restaurant is atomic. Nothing coordinates
/// across restaurants.
pub trait RankingStore: Send + Sync {
    /// Sentiment track: add `delta` to the score, add 1 to the count and
    /// refresh the display name.
    fn bump(&self, restaurant_id: RecordId, name: &str, delta: i64) -> Result<(), RankingError>;

    /// Momentum track: add `delta` to member `"{id}:{name}"` and return its new score.
    fn increment_leaderboard(
        &self,
        restaurant_id: RecordId,
        name: &str,
        delta: i64,
    ) -> Result<i64, RankingError>;

    /// Sentiment track: add `delta` to the score without counting a review.
    fn adjust(&self, restaurant_id: RecordId, delta: i64) -> Result<(), RankingError>;

    /// Up to `n` leaderboard entries, score descending, ties by member descending.
    fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, RankingError>;

    /// Scaled 1-5 rating for one restaurant; 3.0 for an unknown id.
    fn rating(&self, restaurant_id: RecordId) -> Result<f64, RankingError>;

    /// Rating of every named restaurant, rating descending then id ascending.
    fn all_ratings(&self) -> Result<Vec<RestaurantRating>, RankingError>;

    /// Drop the restaurant from both tracks.
    fn remove(&self, restaurant_id: RecordId) -> Result<(), RankingError>;
}

/// `max(1, min(5, 3 + score / count * 2))`.
///
/// A missing score reads as 0 and a missing (or zero) count as 1, so a
/// restaurant without reviews rates exactly 3.0.
pub fn scale_rating(score: Option<i64>, count: Option<i64>) -> f64 {
    let score = score.unwrap_or(0) as f64;
    let count = match count {
        Some(count) if count != 0 => count as f64,
        _ => 1.0,
    };
    (3.0 + score / count * 2.0).clamp(1.0, 5.0)
}

pub fn leaderboard_member(restaurant_id: RecordId, name: &str) -> String {
    format!("{}:{}", restaurant_id, name)
}

pub(crate) fn score_field(restaurant_id: RecordId) -> String {
    format!("{}:score", restaurant_id)
}

pub(crate) fn count_field(restaurant_id: RecordId) -> String {
    format!("{}:count", restaurant_id)
}

pub(crate) fn name_field(restaurant_id: RecordId) -> String {
    format!("{}:name", restaurant_id)
}

/// Order ratings by rating descending, then restaurant id ascending.
pub(crate) fn sort_ratings(ratings: &mut [RestaurantRating]) {
    ratings.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then(a.restaurant_id.cmp(&b.restaurant_id))
    });
}
