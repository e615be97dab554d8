use serde::{Deserialize, Serialize};

use super::{page, require, Catalog, CatalogError};
use crate::event::{RestaurantRemoved, ReviewEvent};
use crate::store::{Batch, Record, RecordId, RecordStore, StoreError, TablesExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub restaurant_id: RecordId,
    pub name: String,
    pub address: String,
    pub cuisine: String,
    /// Mean of this restaurant's review ratings, 0.0 with no reviews.
    #[serde(default)]
    pub average_rating: f64,
}

impl Record for Restaurant {
    const TABLE: &'static str = "restaurants";

    fn id(&self) -> RecordId {
        self.restaurant_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.restaurant_id = id;
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone()), ("address", self.address.clone())]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRestaurant {
    pub name: String,
    pub address: String,
    pub cuisine: String,
}

/// Editable restaurant fields. `average_rating` is derived and never set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub cuisine: Option<String>,
}

impl<S: RecordStore> Catalog<S> {
    pub fn create_restaurant(&self, input: NewRestaurant) -> Result<Restaurant, CatalogError> {
        require("name", &input.name)?;
        require("address", &input.address)?;
        require("cuisine", &input.cuisine)?;

        let saved = self.store().table::<Restaurant>().insert(Restaurant {
            restaurant_id: 0,
            name: input.name,
            address: input.address,
            cuisine: input.cuisine,
            average_rating: 0.0,
        })?;
        Ok(saved.data)
    }

    pub fn get_restaurant(&self, restaurant_id: RecordId) -> Result<Option<Restaurant>, CatalogError> {
        Ok(self
            .store()
            .table::<Restaurant>()
            .get(restaurant_id)?
            .map(|row| row.data))
    }

    pub fn list_restaurants(&self, skip: usize, limit: usize) -> Result<Vec<Restaurant>, CatalogError> {
        Ok(page(self.store().table::<Restaurant>().all()?, skip, limit))
    }

    /// Returns `Ok(None)` when the restaurant does not exist.
    pub fn update_restaurant(
        &self,
        restaurant_id: RecordId,
        update: RestaurantUpdate,
    ) -> Result<Option<Restaurant>, CatalogError> {
        let Some(current) = self.store().table::<Restaurant>().get(restaurant_id)? else {
            return Ok(None);
        };

        let mut restaurant = current.data;
        if let Some(name) = update.name {
            require("name", &name)?;
            restaurant.name = name;
        }
        if let Some(address) = update.address {
            require("address", &address)?;
            restaurant.address = address;
        }
        if let Some(cuisine) = update.cuisine {
            require("cuisine", &cuisine)?;
            restaurant.cuisine = cuisine;
        }

        let saved = self
            .store()
            .table::<Restaurant>()
            .update(restaurant, current.version)?;
        Ok(Some(saved.data))
    }

    /// Delete the row and append `RestaurantRemoved` in one batch.
    ///
    /// Returns the event's sequence, or `None` when the restaurant did not
    /// exist. The restaurant's reviews are kept.
    pub fn remove_restaurant(&self, restaurant_id: RecordId) -> Result<Option<u64>, CatalogError> {
        if self.store().get::<Restaurant>(restaurant_id)?.is_none() {
            return Ok(None);
        }

        let event = ReviewEvent::RestaurantRemoved(RestaurantRemoved { restaurant_id });
        let committed = self.store().commit(
            Batch::new()
                .delete::<Restaurant>(restaurant_id)
                .event(event.to_pending()?),
        );
        match committed {
            Ok(receipt) => Ok(receipt.last_sequence()),
            // lost a race with another delete
            Err(StoreError::Missing { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
