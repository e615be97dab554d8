//! Catalog - the relational records (restaurants, users, admins, reviews)
//! and the CRUD operations that have no derived-state side effects.
//!
//! Writes that feed the rankings (review submission and revision, restaurant
//! removal) go through [`ReviewPipeline`](crate::pipeline::ReviewPipeline);
//! the catalog only stages the row and its event.

mod admin;
mod restaurant;
mod review;
mod user;

use std::sync::Arc;

use thiserror::Error;

use crate::event::PayloadError;
use crate::store::{RecordStore, StoreError};

pub use admin::{Admin, AdminUpdate, NewAdmin, DEFAULT_ADMIN_NAME};
pub use restaurant::{NewRestaurant, Restaurant, RestaurantUpdate};
pub(crate) use review::average_rating;
pub use review::{Review, DEFAULT_DESCRIPTION};
pub use user::{NewUser, Role, User, UserUpdate, UserView};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Event(#[from] PayloadError),
}

impl CatalogError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// CRUD over the relational store. Cheap to clone.
pub struct Catalog<S> {
    store: Arc<S>,
}

impl<S> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RecordStore> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Apply `skip`/`limit` paging to an id-ordered listing.
pub(crate) fn page<T>(rows: Vec<T>, skip: usize, limit: usize) -> Vec<T> {
    rows.into_iter().skip(skip).take(limit).collect()
}
