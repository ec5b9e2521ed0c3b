//! Model listing endpoints.
//!
//! `/v1/models` is the OpenAI-shaped listing and includes shortcode
//! aliases; `/api/models` exposes the raw catalogue records.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::api_types::{ModelData, ModelList};
use crate::catalog::ModelEntry;
use crate::state::AppState;

const OWNED_BY: &str = "sigorest";

/// `GET /v1/models` — ids and shortcodes, deduplicated when equal.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    let created = Utc::now().timestamp();
    let mut data = Vec::new();

    for entry in state.registry.entries() {
        data.push(ModelData {
            id: entry.id.clone(),
            object: "model".to_string(),
            created,
            owned_by: OWNED_BY.to_string(),
        });
        if entry.shortcode != entry.id {
            data.push(ModelData {
                id: entry.shortcode.clone(),
                object: "model".to_string(),
                created,
                owned_by: OWNED_BY.to_string(),
            });
        }
    }

    Json(ModelList {
        object: "list".to_string(),
        data,
    })
}

/// `GET /api/models` — full catalogue records including discovered Ollama
/// entries.
pub async fn list_model_entries(State(state): State<AppState>) -> Json<Vec<ModelEntry>> {
    Json(state.registry.entries().cloned().collect())
}
