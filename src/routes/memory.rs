//! `GET`/`PUT /api/memory` — the shared preamble block.
//!
//! PUT replaces the in-memory block and persists it to disk before
//! answering; a failed disk write is logged but does not fail the request.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use tracing::warn;

use super::error_response;
use crate::memory::{persist_memory, MemoryBlock};
use crate::state::AppState;

pub async fn get_memory(State(state): State<AppState>) -> Json<MemoryBlock> {
    Json(state.memory.read().clone())
}

pub async fn put_memory(State(state): State<AppState>, body: Bytes) -> Response {
    let block: MemoryBlock = match serde_json::from_slice(&body) {
        Ok(block) => block,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON: {err}"),
                "invalid_request",
            );
        }
    };

    *state.memory.write() = block.clone();

    if let Err(err) = persist_memory(&state.memory_path, &block) {
        warn!(error = %err, "memory block not persisted to disk");
    }

    Json(block).into_response()
}
