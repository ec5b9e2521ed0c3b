//! `GET /api/health` — server status and circuit-breaker details.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::providers::circuit_breaker::CircuitBreakerDetails;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BreakerReport {
    pub model: String,
    pub open: bool,
    pub failures: usize,
    pub details: CircuitBreakerDetails,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
    pub available_models: usize,
    pub circuit_breakers: Vec<BreakerReport>,
    pub memory_set: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let circuit_breakers = state
        .breakers
        .snapshot()
        .iter()
        .map(|breaker| BreakerReport {
            model: breaker.model().to_string(),
            open: breaker.is_open(),
            failures: breaker.failure_count(),
            details: breaker.details(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        available_models: state.registry.len(),
        circuit_breakers,
        memory_set: !state.memory.read().content.is_empty(),
    })
}
