//! HTTP transport: maps requests onto command dispatch.
//!
//! - `POST /:command` dispatches a command. The body is the JSON input (empty
//!   means `{}`); request headers become the session.
//! - `GET /health` returns `{ "ok": true, "commands": [...] }`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{error, info};

use super::service::{CommandRequest, Service};

/// Build an axum `Router` that dispatches commands via the given service.
pub fn router<B: Send + Sync + 'static>(service: Arc<Service<B>>) -> Router {
    Router::new()
        .route("/health", get(health_handler::<B>))
        .route("/:command", post(command_handler::<B>))
        .with_state(service)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
///
/// Request headers are trusted as the caller's identity, so `addr` must only
/// be reachable through a gateway that strips `x-user-id` and `x-user-role`
/// from client requests before setting its own.
pub async fn serve<B, F>(service: Arc<Service<B>>, addr: &str, shutdown: F) -> Result<(), std::io::Error>
where
    B: Send + Sync + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health_handler<B: Send + Sync + 'static>(
    State(service): State<Arc<Service<B>>>,
) -> impl IntoResponse {
    Json(json!({ "ok": true, "commands": service.commands() }))
}

async fn command_handler<B: Send + Sync + 'static>(
    State(service): State<Arc<Service<B>>>,
    Path(command): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => value,
            Err(e) => {
                let body = json!({ "error": format!("failed to decode input: {}", e) });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
        }
    };

    let request = CommandRequest {
        command,
        input,
        session_variables: session_from_headers(&headers),
    };

    // Store and ranking calls block; keep them off the async workers.
    let response = match tokio::task::spawn_blocking(move || service.dispatch_request(&request)).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "command task failed");
            let body = json!({ "error": "internal server error" });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

/// All headers, lowercased, become session variables.
fn session_from_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
