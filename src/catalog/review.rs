use serde::{Deserialize, Serialize};

use super::{Catalog, CatalogError, Restaurant, User};
use crate::sentiment::Sentiment;
use crate::store::{Record, RecordId, RecordStore, TablesExt};

pub const DEFAULT_DESCRIPTION: &str = "You can eat here if you have no other way to go";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: RecordId,
    pub rating: u8,
    pub description: String,
    pub user_id: RecordId,
    pub restaurant_id: RecordId,
    /// Always the classification of `description` as last written.
    pub sentiment: Sentiment,
}

impl Record for Review {
    const TABLE: &'static str = "reviews";

    fn id(&self) -> RecordId {
        self.review_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.review_id = id;
    }

    fn references(&self) -> Vec<(&'static str, RecordId)> {
        vec![
            (User::TABLE, self.user_id),
            (Restaurant::TABLE, self.restaurant_id),
        ]
    }
}

/// Mean of `ratings` rounded half-to-even to two decimals, 0.0 when empty.
pub(crate) fn average_rating(ratings: &[u8]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u64 = ratings.iter().map(|r| u64::from(*r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 100.0).round_ties_even() / 100.0
}

impl<S: RecordStore> Catalog<S> {
    pub fn get_review(&self, review_id: RecordId) -> Result<Option<Review>, CatalogError> {
        Ok(self.store().table::<Review>().get(review_id)?.map(|row| row.data))
    }

    pub fn list_reviews(&self) -> Result<Vec<Review>, CatalogError> {
        Ok(self.store().table::<Review>().all()?)
    }

    pub fn reviews_by_rating(&self, rating: u8) -> Result<Vec<Review>, CatalogError> {
        self.reviews_where(&|review| review.rating == rating)
    }

    pub fn reviews_by_user(&self, user_id: RecordId) -> Result<Vec<Review>, CatalogError> {
        self.reviews_where(&|review| review.user_id == user_id)
    }

    pub fn reviews_by_restaurant(&self, restaurant_id: RecordId) -> Result<Vec<Review>, CatalogError> {
        self.reviews_where(&|review| review.restaurant_id == restaurant_id)
    }

    fn reviews_where(&self, predicate: &dyn Fn(&Review) -> bool) -> Result<Vec<Review>, CatalogError> {
        Ok(self
            .store()
            .table::<Review>()
            .find(predicate)?
            .into_iter()
            .map(|row| row.data)
            .collect())
    }
}
