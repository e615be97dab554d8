use serde::Deserialize;
use serde_json::json;

use super::Backend;
use crate::commands::{CommandError, Service};
use crate::pipeline::{NewReview, ReviewPipeline, ReviewUpdate};
use crate::ranking::RankingStore;
use crate::store::{EventLog, RecordId, RecordStore};

pub const SUBMIT: &str = "review.submit";
pub const UPDATE: &str = "review.update";
pub const GET: &str = "review.get";
pub const LIST: &str = "review.list";
pub const BY_RATING: &str = "review.by_rating";
pub const BY_USER: &str = "review.by_user";
pub const BY_RESTAURANT: &str = "review.by_restaurant";

#[derive(Deserialize)]
struct UpdateInput {
    review_id: RecordId,
    #[serde(flatten)]
    update: ReviewUpdate,
}

#[derive(Deserialize)]
struct ReviewId {
    review_id: RecordId,
}

#[derive(Deserialize)]
struct Rating {
    rating: u8,
}

#[derive(Deserialize)]
struct UserId {
    user_id: RecordId,
}

#[derive(Deserialize)]
struct RestaurantId {
    restaurant_id: RecordId,
}

impl<S, K> Service<Backend<S, K>>
where
    S: RecordStore + EventLog + 'static,
    K: RankingStore + 'static,
{
    /// Review submission, revision and queries.
    pub fn review_commands(self) -> Self {
        self.command(SUBMIT, |ctx| {
            let identity = ctx.identity()?;
            let input: NewReview = ctx.input()?;
            let review = ctx.backend().submit_review(&identity, input)?;
            Ok(json!(review))
        })
        .command_guarded(
            UPDATE,
            |ctx| ctx.has_field("review_id"),
            |ctx| {
                let identity = ctx.identity()?;
                let input: UpdateInput = ctx.input()?;
                let pipeline: &ReviewPipeline<S, K> = ctx.backend();

                let existing = pipeline
                    .get_review(input.review_id)?
                    .ok_or_else(|| CommandError::not_found("review", input.review_id))?;
                if existing.user_id != identity.user_id && !identity.is_admin() {
                    return Err(CommandError::Forbidden(
                        "only the author may edit a review".into(),
                    ));
                }

                let review = pipeline
                    .update_review(input.review_id, input.update)?
                    .ok_or_else(|| CommandError::not_found("review", input.review_id))?;
                Ok(json!(review))
            },
        )
        .command(GET, |ctx| {
            let input: ReviewId = ctx.input()?;
            let review = ctx
                .backend()
                .get_review(input.review_id)?
                .ok_or_else(|| CommandError::not_found("review", input.review_id))?;
            Ok(json!(review))
        })
        .command(LIST, |ctx| Ok(json!(ctx.backend().list_reviews()?)))
        .command(BY_RATING, |ctx| {
            let input: Rating = ctx.input()?;
            Ok(json!(ctx.backend().reviews_by_rating(input.rating)?))
        })
        .command(BY_USER, |ctx| {
            let input: UserId = ctx.input()?;
            Ok(json!(ctx.backend().reviews_by_user(input.user_id)?))
        })
        .command(BY_RESTAURANT, |ctx| {
            let input: RestaurantId = ctx.input()?;
            Ok(json!(ctx.backend().reviews_by_restaurant(input.restaurant_id)?))
        })
    }
}
