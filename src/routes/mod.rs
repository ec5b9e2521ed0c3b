//! HTTP surface of the gateway.

pub mod chat;
pub mod health;
pub mod help;
pub mod memory;
pub mod models;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;

use crate::api_types::ErrorEnvelope;
use crate::state::AppState;

/// Assemble the gateway router. Listener-specific IP gating is layered on
/// in `main`, so tests can drive the bare router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(models::list_models))
        .route("/api/models", get(models::list_model_entries))
        .route("/api/health", get(health::health))
        .route(
            "/api/memory",
            get(memory::get_memory).put(memory::put_memory),
        )
        .route("/api/help", get(help::help))
        .with_state(state)
}

/// OpenAI-shaped error envelope with the given status.
pub(crate) fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    error_type: &str,
) -> Response {
    (status, Json(ErrorEnvelope::new(message, error_type))).into_response()
}
