use serde::Deserialize;
use serde_json::json;

use super::{Backend, Paging};
use crate::catalog::{NewRestaurant, RestaurantUpdate};
use crate::commands::{CommandError, Service};
use crate::ranking::RankingStore;
use crate::store::{EventLog, RecordId, RecordStore};

pub const CREATE: &str = "restaurant.create";
pub const GET: &str = "restaurant.get";
pub const LIST: &str = "restaurant.list";
pub const UPDATE: &str = "restaurant.update";
pub const DELETE: &str = "restaurant.delete";

#[derive(Deserialize)]
struct RestaurantId {
    restaurant_id: RecordId,
}

#[derive(Deserialize)]
struct UpdateInput {
    restaurant_id: RecordId,
    #[serde(flatten)]
    update: RestaurantUpdate,
}

impl<S, K> Service<Backend<S, K>>
where
    S: RecordStore + EventLog + 'static,
    K: RankingStore + 'static,
{
    /// Restaurant CRUD. Writes are admin-only.
    pub fn restaurant_commands(self) -> Self {
        self.command(CREATE, |ctx| {
            ctx.require_admin()?;
            let input: NewRestaurant = ctx.input()?;
            Ok(json!(ctx.backend().catalog().create_restaurant(input)?))
        })
        .command(GET, |ctx| {
            let input: RestaurantId = ctx.input()?;
            let restaurant = ctx
                .backend()
                .catalog()
                .get_restaurant(input.restaurant_id)?
                .ok_or_else(|| CommandError::not_found("restaurant", input.restaurant_id))?;
            Ok(json!(restaurant))
        })
        .command(LIST, |ctx| {
            let paging: Paging = ctx.input()?;
            let restaurants = ctx
                .backend()
                .catalog()
                .list_restaurants(paging.skip, paging.limit)?;
            Ok(json!(restaurants))
        })
        .command_guarded(
            UPDATE,
            |ctx| ctx.has_field("restaurant_id"),
            |ctx| {
                ctx.require_admin()?;
                let input: UpdateInput = ctx.input()?;
                let restaurant = ctx
                    .backend()
                    .catalog()
                    .update_restaurant(input.restaurant_id, input.update)?
                    .ok_or_else(|| CommandError::not_found("restaurant", input.restaurant_id))?;
                Ok(json!(restaurant))
            },
        )
        .command(DELETE, |ctx| {
            ctx.require_admin()?;
            let input: RestaurantId = ctx.input()?;
            if !ctx.backend().delete_restaurant(input.restaurant_id)? {
                return Err(CommandError::not_found("restaurant", input.restaurant_id));
            }
            Ok(json!({ "deleted": true, "restaurant_id": input.restaurant_id }))
        })
    }
}
