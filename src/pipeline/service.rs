use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use super::{Identity, NewReview, PipelineConfig, ReviewError, ReviewUpdate};
use crate::catalog::{Catalog, Restaurant, Review};
use crate::event::{ReviewEvent, ReviewRevised, ReviewSubmitted};
use crate::projection::{
    AggregateProjection, LeaderboardProjection, ProjectionReport, ProjectionRunner,
    ProjectionWorker, SentimentRatingProjection,
};
use crate::ranking::{LeaderboardEntry, RankingStore, RestaurantRating};
use crate::sentiment;
use crate::store::{Batch, EventLog, Record, RecordId, RecordStore, StoreError, TablesExt};

/// The review write path and the leaderboard read path.
pub struct ReviewPipeline<S, K> {
    catalog: Catalog<S>,
    ranking: Arc<K>,
    runner: Arc<ProjectionRunner<S>>,
    config: PipelineConfig,
}

impl<S, K> ReviewPipeline<S, K>
where
    S: RecordStore + EventLog + 'static,
    K: RankingStore + 'static,
{
    pub fn new(store: Arc<S>, ranking: Arc<K>, config: PipelineConfig) -> Self {
        let runner = ProjectionRunner::new(Arc::clone(&store))
            .with_projector(AggregateProjection::new(Arc::clone(&store)))
            .with_projector(LeaderboardProjection::new(
                Arc::clone(&ranking),
                config.rescore_on_edit,
            ))
            .with_projector(SentimentRatingProjection::new(
                Arc::clone(&ranking),
                config.rescore_on_edit,
            ));

        Self {
            catalog: Catalog::new(store),
            ranking,
            runner: Arc::new(runner),
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate, classify and persist a review, then project it.
    ///
    /// The review and its `ReviewSubmitted` event commit atomically. Once
    /// that commit succeeds the review is returned even if a projection
    /// fails; the projection is retried later.
    pub fn submit_review(&self, identity: &Identity, input: NewReview) -> Result<Review, ReviewError> {
        let _span = info_span!(
            "submit_review",
            user_id = identity.user_id,
            restaurant_id = input.restaurant_id
        )
        .entered();

        self.config.validate_rating(input.rating)?;
        self.config.validate_description(&input.description)?;
        let sentiment = sentiment::classify(&input.description);

        let store = self.catalog.store();
        let restaurant = store
            .table::<Restaurant>()
            .get(input.restaurant_id)?
            .ok_or(StoreError::ForeignKey {
                table: Restaurant::TABLE.into(),
                id: input.restaurant_id,
            })?
            .data;

        let review = Review {
            review_id: store.allocate_id(Review::TABLE)?,
            rating: input.rating,
            description: input.description,
            user_id: identity.user_id,
            restaurant_id: restaurant.restaurant_id,
            sentiment,
        };
        let event = ReviewEvent::ReviewSubmitted(ReviewSubmitted {
            review_id: review.review_id,
            user_id: review.user_id,
            restaurant_id: review.restaurant_id,
            restaurant_name: restaurant.name,
            rating: review.rating,
            sentiment,
        });

        let pending = event
            .to_pending()?
            .with_meta("actor", identity.user_id.to_string())
            .with_meta("actor_role", identity.role.as_str());
        let receipt = store.commit(Batch::new().insert(&review)?.event(pending))?;
        info!(
            review_id = review.review_id,
            sentiment = %sentiment,
            sequence = receipt.last_sequence(),
            "review submitted"
        );

        self.project();
        Ok(review)
    }

    /// Change a review's rating and/or description.
    ///
    /// Returns `Ok(None)` when the review does not exist. A new description
    /// always recomputes the stored sentiment.
    pub fn update_review(
        &self,
        review_id: RecordId,
        update: ReviewUpdate,
    ) -> Result<Option<Review>, ReviewError> {
        let _span = info_span!("update_review", review_id).entered();

        let store = self.catalog.store();
        let Some(current) = store.table::<Review>().get(review_id)? else {
            return Ok(None);
        };
        let previous = current.data.clone();
        let mut review = current.data;

        if let Some(rating) = update.rating {
            self.config.validate_rating(rating)?;
            review.rating = rating;
        }
        if let Some(description) = update.description {
            self.config.validate_description(&description)?;
            review.sentiment = sentiment::classify(&description);
            review.description = description;
        }

        let mut batch = Batch::new().update(&review, current.version)?;
        // a removed restaurant has no derived state left to revise
        if let Some(restaurant) = store.table::<Restaurant>().get(review.restaurant_id)? {
            let event = ReviewEvent::ReviewRevised(ReviewRevised {
                review_id,
                restaurant_id: review.restaurant_id,
                restaurant_name: restaurant.data.name,
                previous_rating: previous.rating,
                rating: review.rating,
                previous_sentiment: previous.sentiment,
                sentiment: review.sentiment,
            });
            batch = batch.event(event.to_pending()?);
        }

        store.commit(batch)?;
        debug!(
            rating = review.rating,
            sentiment = %review.sentiment,
            "review updated"
        );

        self.project();
        Ok(Some(review))
    }

    /// Delete a restaurant and drop it from both ranking tracks.
    ///
    /// Returns false when the restaurant did not exist.
    pub fn delete_restaurant(&self, restaurant_id: RecordId) -> Result<bool, ReviewError> {
        match self.catalog.remove_restaurant(restaurant_id)? {
            Some(sequence) => {
                info!(restaurant_id, sequence, "restaurant removed");
                self.project();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get_review(&self, review_id: RecordId) -> Result<Option<Review>, ReviewError> {
        Ok(self.catalog.get_review(review_id)?)
    }

    pub fn list_reviews(&self) -> Result<Vec<Review>, ReviewError> {
        Ok(self.catalog.list_reviews()?)
    }

    pub fn reviews_by_rating(&self, rating: u8) -> Result<Vec<Review>, ReviewError> {
        Ok(self.catalog.reviews_by_rating(rating)?)
    }

    pub fn reviews_by_user(&self, user_id: RecordId) -> Result<Vec<Review>, ReviewError> {
        Ok(self.catalog.reviews_by_user(user_id)?)
    }

    pub fn reviews_by_restaurant(&self, restaurant_id: RecordId) -> Result<Vec<Review>, ReviewError> {
        Ok(self.catalog.reviews_by_restaurant(restaurant_id)?)
    }

    /// Top `top_n` restaurants by momentum score. Reads only the ranking store.
    pub fn get_leaderboard(&self, top_n: usize) -> Result<Vec<LeaderboardEntry>, ReviewError> {
        Ok(self.ranking.top(top_n)?)
    }

    /// Every rated restaurant, best first. Reads only the ranking store.
    pub fn get_all_restaurant_ratings(&self) -> Result<Vec<RestaurantRating>, ReviewError> {
        Ok(self.ranking.all_ratings()?)
    }

    pub fn get_restaurant_rating(&self, restaurant_id: RecordId) -> Result<f64, ReviewError> {
        Ok(self.ranking.rating(restaurant_id)?)
    }

    /// Apply every event a projection has not yet applied.
    pub fn reconcile(&self) -> ProjectionReport {
        let report = self.runner.catch_up();
        if report.applied > 0 {
            info!(applied = report.applied, failures = report.failures.len(), "reconciled");
        }
        report
    }

    pub fn runner(&self) -> Arc<ProjectionRunner<S>> {
        Arc::clone(&self.runner)
    }

    /// Start a background [`ProjectionWorker`] at the configured interval.
    pub fn spawn_worker(&self) -> ProjectionWorker {
        ProjectionWorker::spawn(self.runner(), self.config.projection_poll_interval)
    }

    fn project(&self) {
        let report = self.runner.catch_up();
        for failure in &report.failures {
            warn!(
                projection = failure.projection,
                sequence = failure.sequence,
                error = %failure.error,
                "projection deferred"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewRestaurant, NewUser, Role};
    use crate::ranking::InMemoryRankingStore;
    use crate::sentiment::Sentiment;
    use crate::store::InMemoryRecordStore;

    type Pipeline = ReviewPipeline<InMemoryRecordStore, InMemoryRankingStore>;

    fn pipeline() -> Pipeline {
        ReviewPipeline::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryRankingStore::new()),
            PipelineConfig::default(),
        )
    }

    fn seed(pipeline: &Pipeline) -> (Identity, RecordId) {
        let user = pipeline
            .catalog()
            .create_user(NewUser {
                username: "ada".into(),
                credential_hash: "h".into(),
                role: Role::User,
            })
            .unwrap();
        let restaurant = pipeline
            .catalog()
            .create_restaurant(NewRestaurant {
                name: "Chez Nous".into(),
                address: "1 Rue".into(),
                cuisine: "french".into(),
            })
            .unwrap();
        (
            Identity {
                user_id: user.user_id,
                role: user.role,
            },
            restaurant.restaurant_id,
        )
    }

    fn review(rating: u8, description: &str, restaurant_id: RecordId) -> NewReview {
        NewReview {
            rating,
            description: description.into(),
            restaurant_id,
        }
    }

    #[test]
    fn invalid_rating_writes_nothing() {
        let pipeline = pipeline();
        let (identity, restaurant_id) = seed(&pipeline);

        let err = pipeline
            .submit_review(&identity, review(6, "Great", restaurant_id))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Validation(_)));
        assert!(pipeline.list_reviews().unwrap().is_empty());
        assert_eq!(pipeline.catalog().store().head().unwrap(), 0);
    }

    #[test]
    fn submission_event_records_the_actor() {
        let pipeline = pipeline();
        let (identity, restaurant_id) = seed(&pipeline);
        pipeline
            .submit_review(&identity, review(5, "Great", restaurant_id))
            .unwrap();

        let records = pipeline.catalog().store().read_after(0, 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].meta("actor"), Some("1"));
        assert_eq!(records[0].meta("actor_role"), Some("USER"));
    }

    #[test]
    fn unknown_restaurant_is_a_persistence_error() {
        let pipeline = pipeline();
        let (identity, _) = seed(&pipeline);
        let err = pipeline
            .submit_review(&identity, review(4, "Great", 99))
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Persistence(StoreError::ForeignKey { id: 99, .. })
        ));
    }

    #[test]
    fn unknown_author_is_a_persistence_error() {
        let pipeline = pipeline();
        let (_, restaurant_id) = seed(&pipeline);
        let stranger = Identity {
            user_id: 42,
            role: Role::User,
        };
        let err = pipeline
            .submit_review(&stranger, review(4, "Great", restaurant_id))
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Persistence(StoreError::ForeignKey { id: 42, .. })
        ));
        assert!(pipeline.list_reviews().unwrap().is_empty());
    }

    #[test]
    fn update_recomputes_sentiment_and_average() {
        let pipeline = pipeline();
        let (identity, restaurant_id) = seed(&pipeline);
        let created = pipeline
            .submit_review(&identity, review(5, "Amazing food!", restaurant_id))
            .unwrap();

        let updated = pipeline
            .update_review(
                created.review_id,
                ReviewUpdate {
                    rating: Some(1),
                    description: Some("Terrible, cold and bland.".into()),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.sentiment, Sentiment::Negative);

        let stored = pipeline.get_review(created.review_id).unwrap().unwrap();
        assert_eq!(stored, updated);
        let restaurant = pipeline.catalog().get_restaurant(restaurant_id).unwrap().unwrap();
        assert_eq!(restaurant.average_rating, 1.0);

        // rankings keep the submission's delta
        assert_eq!(pipeline.get_leaderboard(1).unwrap()[0].score, 1);
    }

    #[test]
    fn update_of_missing_review_is_none() {
        let pipeline = pipeline();
        assert!(pipeline
            .update_review(5, ReviewUpdate::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn delete_restaurant_clears_rankings() {
        let pipeline = pipeline();
        let (identity, restaurant_id) = seed(&pipeline);
        pipeline
            .submit_review(&identity, review(5, "Amazing food!", restaurant_id))
            .unwrap();

        assert!(pipeline.delete_restaurant(restaurant_id).unwrap());
        assert!(pipeline.get_leaderboard(10).unwrap().is_empty());
        assert!(pipeline.get_all_restaurant_ratings().unwrap().is_empty());
        assert!(!pipeline.delete_restaurant(restaurant_id).unwrap());
    }
}
