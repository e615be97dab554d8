//! Command errors and their HTTP status mapping.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::pipeline::ReviewError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    #[error("guard rejected command: {0}")]
    GuardRejected(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Review(#[from] ReviewError),
}

impl From<CatalogError> for CommandError {
    fn from(err: CatalogError) -> Self {
        CommandError::Review(err.into())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::DecodeFailed(err.to_string())
    }
}

impl CommandError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CommandError::Review(ReviewError::NotFound {
            entity,
            id: id.to_string(),
        })
    }

    /// Map this error to an HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            CommandError::UnknownCommand(_) => 404,
            CommandError::DecodeFailed(_) => 400,
            CommandError::GuardRejected(_) => 400,
            CommandError::Unauthorized(_) => 401,
            CommandError::Forbidden(_) => 403,
            CommandError::Review(err) => match err {
                ReviewError::Validation(_) => 400,
                ReviewError::NotFound { .. } => 404,
                ReviewError::Persistence(StoreError::ForeignKey { .. }) => 404,
                ReviewError::Persistence(StoreError::UniqueViolation { .. }) => 409,
                ReviewError::Persistence(StoreError::Conflict { .. }) => 409,
                ReviewError::Persistence(_) | ReviewError::Ranking(_) | ReviewError::Event(_) => {
                    500
                }
            },
        }
    }

    /// The message a client may see. Server-side failures are not described.
    pub fn public_message(&self) -> String {
        if self.status_code() >= 500 {
            "internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}
