use serde::Deserialize;
use serde_json::json;

use super::Backend;
use crate::commands::Service;
use crate::ranking::RankingStore;
use crate::store::{EventLog, RecordId, RecordStore};

pub const TOP: &str = "leaderboard.top";
pub const RATINGS: &str = "leaderboard.ratings";
pub const RATING: &str = "leaderboard.rating";

#[derive(Deserialize)]
struct TopInput {
    top_n: Option<usize>,
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
    /// Leaderboard reads. These only touch the ranking store.
    pub fn leaderboard_commands(self) -> Self {
        self.command(TOP, |ctx| {
            let input: TopInput = ctx.input()?;
            let pipeline = ctx.backend();
            let top_n = input.top_n.unwrap_or(pipeline.config().default_top_n);
            Ok(json!(pipeline.get_leaderboard(top_n)?))
        })
        .command(RATINGS, |ctx| {
            Ok(json!(ctx.backend().get_all_restaurant_ratings()?))
        })
        .command(RATING, |ctx| {
            let input: RestaurantId = ctx.input()?;
            let rating = ctx.backend().get_restaurant_rating(input.restaurant_id)?;
            Ok(json!({ "restaurant_id": input.restaurant_id, "rating": rating }))
        })
    }
}
