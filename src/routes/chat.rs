//! `POST /v1/chat/completions` — the request orchestrator.
//!
//! Lifecycle: decode, resolve the model, copy the memory block, compose
//! the outgoing payload (consulting the session store), then run
//! retry(breaker(upstream call)) under a per-request cancellation token.
//! Success persists the exchange to the session and answers in the OpenAI
//! response shape; failure maps the classified error onto the envelope.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use http::header::RETRY_AFTER;
use http::{HeaderValue, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::error;

use super::error_response;
use crate::api_types::{ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::providers::{compose, retry, upstream, ApiError, ApiErrorKind, ProviderConfig};
use crate::state::AppState;

pub async fn chat_completions(State(state): State<AppState>, body: Bytes) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON: {err}"),
                "invalid_request",
            );
        }
    };

    let Some(entry) = state.registry.resolve(&req.model).cloned() else {
        let err = ApiError::config_not_found(format!("Model '{}' not found", req.model));
        return api_error_response(&req.model, &err);
    };

    let memory = state.memory.read().clone();

    let options = compose::resolve_options(&req, &entry);

    let session_id = req
        .session_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or_default();

    let history = if session_id.is_empty() {
        Vec::new()
    } else {
        state.sessions.load(&req.model, session_id).history
    };

    let (messages, user_prompt) = compose::build_messages(&memory, &history, &req.messages);

    let provider = match ProviderConfig::resolve(&entry) {
        Ok(provider) => provider,
        Err(err) => return api_error_response(&req.model, &err),
    };

    // Serialize once; retries clone bytes instead of re-encoding.
    let payload = compose::build_payload(&entry, messages, &options);
    let payload_bytes = serde_json::to_vec(&payload).unwrap_or_default();

    // Breakers are keyed by the model token the client used.
    let breaker = state
        .breakers
        .get_or_create(&req.model, &state.breaker_config);

    let cancel = CancellationToken::new();
    let deadline = {
        let cancel = cancel.clone();
        let timeout = options.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let retry_config = state.retry_config.with_max_retries(options.retries);

    let result = retry::retry_with_backoff(&cancel, &retry_config, || {
        let breaker = Arc::clone(&breaker);
        let client = state.http.clone();
        let provider = provider.clone();
        let payload_bytes = payload_bytes.clone();
        let timeout = options.timeout;
        async move {
            breaker
                .run(|| async {
                    upstream::call_upstream(&client, &provider, &payload_bytes, timeout).await
                })
                .await
        }
    })
    .await;

    // The timer task must not outlive the request it times out.
    deadline.abort();

    let text = match result {
        Ok(text) => text,
        Err(err) => return api_error_response(&req.model, &err),
    };

    if let Some(user_prompt) = user_prompt.filter(|p| !p.is_empty()) {
        if !session_id.is_empty() {
            state
                .sessions
                .append_exchange(&req.model, session_id, &user_prompt, &text)
                .await;
        }
    }

    let now = Utc::now();
    let response = ChatCompletionResponse {
        id: format!("chatcmpl-{}", now.timestamp_nanos_opt().unwrap_or_default()),
        object: "chat.completion".to_string(),
        created: now.timestamp(),
        model: req.model.clone(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage::new("assistant", text),
        }],
    };

    Json(response).into_response()
}

/// Map a classified pipeline error onto the client-visible envelope.
fn api_error_response(model: &str, err: &ApiError) -> Response {
    error!(
        model = %model,
        kind = %err.kind,
        status = ?err.status,
        "chat completion failed"
    );

    let mut response = error_response(
        err.http_status(),
        err.message.clone(),
        err.client_error_type(),
    );

    if err.kind == ApiErrorKind::RateLimit {
        if let Some(retry_after) = err.retry_after.filter(|d| !d.is_zero()) {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
    }

    response
}
