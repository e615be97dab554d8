//! The two ranking-store projections. They see the same events but keep
//! independent tracks: raw momentum for the leaderboard, score over count
//! for the sentiment rating.

use std::sync::Arc;

use super::{ProjectionError, Projector};
use crate::event::{EventRecord, ReviewEvent};
use crate::ranking::RankingStore;
use crate::store::Batch;

/// Momentum leaderboard: sorted-set increments by sentiment delta.
pub struct LeaderboardProjection<K> {
    ranking: Arc<K>,
    rescore_on_edit: bool,
}

impl<K: RankingStore> LeaderboardProjection<K> {
    pub const NAME: &'static str = "leaderboard";

    /// With `rescore_on_edit`, a revision that changes the sentiment moves the
    /// score by the difference between the new and the old delta.
    pub fn new(ranking: Arc<K>, rescore_on_edit: bool) -> Self {
        Self {
            ranking,
            rescore_on_edit,
        }
    }
}

impl<K: RankingStore> Projector for LeaderboardProjection<K> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, _record: &EventRecord, event: &ReviewEvent) -> Result<Batch, ProjectionError> {
        match event {
            ReviewEvent::ReviewSubmitted(e) => {
                self.ranking.increment_leaderboard(
                    e.restaurant_id,
                    &e.restaurant_name,
                    e.sentiment.delta(),
                )?;
            }
            ReviewEvent::ReviewRevised(e) => {
                let shift = e.sentiment_shift();
                if self.rescore_on_edit && shift != 0 {
                    self.ranking
                        .increment_leaderboard(e.restaurant_id, &e.restaurant_name, shift)?;
                }
            }
            ReviewEvent::RestaurantRemoved(e) => self.ranking.remove(e.restaurant_id)?,
        }
        Ok(Batch::new())
    }
}

/// Sentiment rating: per-restaurant score and review count.
pub struct SentimentRatingProjection<K> {
    ranking: Arc<K>,
    rescore_on_edit: bool,
}

impl<K: RankingStore> SentimentRatingProjection<K> {
    pub const NAME: &'static str = "sentiment_rating";

    /// With `rescore_on_edit`, a revision adjusts the score without counting
    /// another review.
    pub fn new(ranking: Arc<K>, rescore_on_edit: bool) -> Self {
        Self {
            ranking,
            rescore_on_edit,
        }
    }
}

impl<K: RankingStore> Projector for SentimentRatingProjection<K> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, _record: &EventRecord, event: &ReviewEvent) -> Result<Batch, ProjectionError> {
        match event {
            ReviewEvent::ReviewSubmitted(e) => {
                self.ranking
                    .bump(e.restaurant_id, &e.restaurant_name, e.sentiment.delta())?;
            }
            ReviewEvent::ReviewRevised(e) => {
                let shift = e.sentiment_shift();
                if self.rescore_on_edit && shift != 0 {
                    self.ranking.adjust(e.restaurant_id, shift)?;
                }
            }
            ReviewEvent::RestaurantRemoved(e) => self.ranking.remove(e.restaurant_id)?,
        }
        Ok(Batch::new())
    }
}
