//! Shared fixtures: an in-memory pipeline with seeded users and restaurants.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use restaurant_reviews::catalog::{NewRestaurant, NewUser, Restaurant, Role};
use restaurant_reviews::commands::{CommandRequest, USER_ID_VAR, USER_ROLE_VAR};
use restaurant_reviews::{
    Identity, InMemoryRankingStore, InMemoryRecordStore, NewReview, PipelineConfig, ReviewPipeline,
};
use serde_json::Value;

pub type Pipeline = ReviewPipeline<InMemoryRecordStore, InMemoryRankingStore>;

/// A pipeline plus direct handles on both of its stores.
pub struct Harness {
    pub store: Arc<InMemoryRecordStore>,
    pub ranking: Arc<InMemoryRankingStore>,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let ranking = Arc::new(InMemoryRankingStore::new());
        let pipeline = ReviewPipeline::new(Arc::clone(&store), Arc::clone(&ranking), config);
        Self {
            store,
            ranking,
            pipeline,
        }
    }

    pub fn user(&self, username: &str) -> Identity {
        self.account(username, Role::User)
    }

    pub fn admin(&self, username: &str) -> Identity {
        self.account(username, Role::Admin)
    }

    fn account(&self, username: &str, role: Role) -> Identity {
        let user = self
            .pipeline
            .catalog()
            .create_user(NewUser {
                username: username.to_string(),
                credential_hash: format!("hash-of-{username}"),
                role,
            })
            .unwrap();
        Identity {
            user_id: user.user_id,
            role: user.role,
        }
    }

    pub fn restaurant(&self, name: &str) -> Restaurant {
        self.pipeline
            .catalog()
            .create_restaurant(NewRestaurant {
                name: name.to_string(),
                address: format!("{name} street"),
                cuisine: "bistro".to_string(),
            })
            .unwrap()
    }

    pub fn review(&self, identity: &Identity, restaurant: &Restaurant, rating: u8, description: &str) {
        self.pipeline
            .submit_review(identity, new_review(restaurant.restaurant_id, rating, description))
            .unwrap();
    }
}

pub fn new_review(restaurant_id: i64, rating: u8, description: &str) -> NewReview {
    NewReview {
        rating,
        description: description.to_string(),
        restaurant_id,
    }
}

/// Session variables as the authentication gateway forwards them.
pub fn session_vars(identity: Option<Identity>) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    if let Some(identity) = identity {
        vars.insert(USER_ID_VAR.to_string(), identity.user_id.to_string());
        vars.insert(USER_ROLE_VAR.to_string(), identity.role.as_str().to_string());
    }
    vars
}

pub fn request(command: &str, input: Value, identity: Option<Identity>) -> CommandRequest {
    CommandRequest {
        command: command.to_string(),
        input,
        session_variables: session_vars(identity),
    }
}
