use thiserror::Error;

use crate::catalog::CatalogError;
use crate::event::PayloadError;
use crate::ranking::RankingError;
use crate::store::StoreError;

/// Errors surfaced by [`ReviewPipeline`](super::ReviewPipeline).
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Bad input. Nothing was written.
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    /// The relational store rejected or could not take the write.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
    #[error("ranking store error: {0}")]
    Ranking(#[from] RankingError),
    #[error("event encoding error: {0}")]
    Event(#[from] PayloadError),
}

impl From<CatalogError> for ReviewError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(message) => ReviewError::Validation(message),
            CatalogError::NotFound { entity, id } => ReviewError::NotFound { entity, id },
            CatalogError::Persistence(err) => ReviewError::Persistence(err),
            CatalogError::Event(err) => ReviewError::Event(err),
        }
    }
}
