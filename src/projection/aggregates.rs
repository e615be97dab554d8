use std::sync::Arc;

use super::{ProjectionError, Projector};
use crate::catalog::{average_rating, Restaurant, Review, User};
use crate::event::{EventRecord, ReviewEvent};
use crate::store::{Batch, RecordId, RecordStore, TablesExt};

/// Relational aggregates: `User.review_count` and `Restaurant.average_rating`.
///
/// Its writes commit in the same batch as its checkpoint, so each event
/// lands exactly once.
pub struct AggregateProjection<S> {
    store: Arc<S>,
}

impl<S: RecordStore> AggregateProjection<S> {
    pub const NAME: &'static str = "aggregates";

    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn count_review(&self, batch: Batch, user_id: RecordId) -> Result<Batch, ProjectionError> {
        // the author may have been deleted since
        let Some(row) = self.store.table::<User>().get(user_id)? else {
            return Ok(batch);
        };
        let mut user = row.data;
        user.review_count += 1;
        Ok(batch.update(&user, row.version)?)
    }

    fn refresh_average(&self, batch: Batch, restaurant_id: RecordId) -> Result<Batch, ProjectionError> {
        let Some(row) = self.store.table::<Restaurant>().get(restaurant_id)? else {
            return Ok(batch);
        };
        let ratings: Vec<u8> = self
            .store
            .table::<Review>()
            .find(&|review| review.restaurant_id == restaurant_id)?
            .into_iter()
            .map(|review| review.data.rating)
            .collect();

        let average = average_rating(&ratings);
        if row.data.average_rating == average {
            return Ok(batch);
        }
        let mut restaurant = row.data;
        restaurant.average_rating = average;
        Ok(batch.update(&restaurant, row.version)?)
    }
}

impl<S: RecordStore> Projector for AggregateProjection<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, _record: &EventRecord, event: &ReviewEvent) -> Result<Batch, ProjectionError> {
        match event {
            ReviewEvent::ReviewSubmitted(e) => {
                let batch = self.count_review(Batch::new(), e.user_id)?;
                self.refresh_average(batch, e.restaurant_id)
            }
            ReviewEvent::ReviewRevised(e) => self.refresh_average(Batch::new(), e.restaurant_id),
            ReviewEvent::RestaurantRemoved(_) => Ok(Batch::new()),
        }
    }
}
