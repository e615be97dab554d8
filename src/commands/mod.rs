//! Command layer: named commands dispatched against the review pipeline.
//!
//! Handlers are registered on a [`Service`]; each receives a [`Context`]
//! carrying the JSON input, the caller's [`Session`] and the backend.
//!
//! ```ignore
//! let service = Arc::new(commands::review_service(pipeline));
//! let response = service.dispatch_request(&CommandRequest {
//!     command: "leaderboard.top".into(),
//!     input: json!({ "top_n": 5 }),
//!     session_variables: HashMap::new(),
//! });
//! ```

mod context;
mod error;
pub mod handlers;
mod service;
mod session;

pub use context::Context;
pub use error::CommandError;
pub use handlers::{review_service, Backend};
pub use service::{CommandRequest, CommandResponse, Service};
pub use session::{Session, USER_ID_VAR, USER_ROLE_VAR};

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::{router, serve};
