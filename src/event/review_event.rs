use serde::{Deserialize, Serialize};

use super::{EventRecord, PayloadError, PendingEvent};
use crate::sentiment::Sentiment;
use crate::store::RecordId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmitted {
    pub review_id: RecordId,
    pub user_id: RecordId,
    pub restaurant_id: RecordId,
    pub restaurant_name: String,
    pub rating: u8,
    pub sentiment: Sentiment,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRevised {
    pub review_id: RecordId,
    pub restaurant_id: RecordId,
    pub restaurant_name: String,
    pub previous_rating: u8,
    pub rating: u8,
    pub previous_sentiment: Sentiment,
    pub sentiment: Sentiment,
}

impl ReviewRevised {
    /// Difference in ranking contribution between the new and the old sentiment.
    pub fn sentiment_shift(&self) -> i64 {
        self.sentiment.delta() - self.previous_sentiment.delta()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRemoved {
    pub restaurant_id: RecordId,
}

/// Events that drive the derived review state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReviewEvent {
    ReviewSubmitted(ReviewSubmitted),
    ReviewRevised(ReviewRevised),
    RestaurantRemoved(RestaurantRemoved),
}

impl ReviewEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ReviewEvent::ReviewSubmitted(_) => "ReviewSubmitted",
            ReviewEvent::ReviewRevised(_) => "ReviewRevised",
            ReviewEvent::RestaurantRemoved(_) => "RestaurantRemoved",
        }
    }

    /// Stage this event for a batch commit.
    pub fn to_pending(&self) -> Result<PendingEvent, PayloadError> {
        PendingEvent::encode(self.name(), self)
    }

    pub fn from_record(record: &EventRecord) -> Result<Self, PayloadError> {
        let event: ReviewEvent = record.decode()?;
        if event.name() != record.event_name {
            return Err(PayloadError {
                message: format!(
                    "event {} carries a {} payload",
                    record.event_name,
                    event.name()
                ),
            });
        }
        Ok(event)
    }
}
