//! Restaurant review backend.
//!
//! Reviews are validated, classified by sentiment and committed together
//! with a review event. Projections over the event log keep the derived
//! state current: user review counts, restaurant averages, the momentum
//! leaderboard and the sentiment rating track.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod event;
pub mod pipeline;
pub mod projection;
pub mod ranking;
pub mod sentiment;
pub mod store;

pub use catalog::{Catalog, CatalogError};
pub use commands::{review_service, CommandError, CommandRequest, CommandResponse, Service, Session};
pub use config::Config;
pub use pipeline::{Identity, NewReview, PipelineConfig, ReviewError, ReviewPipeline, ReviewUpdate};
pub use projection::{ProjectionReport, ProjectionRunner, ProjectionWorker};
pub use ranking::{InMemoryRankingStore, LeaderboardEntry, RankingError, RankingStore, RestaurantRating};
pub use sentiment::Sentiment;
pub use store::{EventLog, InMemoryRecordStore, RecordStore, StoreError};

#[cfg(feature = "redis")]
pub use ranking::RedisRankingStore;
