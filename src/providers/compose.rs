//! Assembly of the outgoing upstream payload.
//!
//! The message list is built in a strict order: the shared memory preamble
//! first, then persisted session history, then the client's messages in
//! their original positions (client-supplied system messages included).
//! Field defaulting distinguishes "absent" from explicit values, so
//! `temperature: 0` means deterministic sampling, not "use the default".

use std::time::Duration;

use serde::Serialize;

use crate::api_types::{ChatCompletionRequest, ChatMessage};
use crate::catalog::ModelEntry;
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::memory::MemoryBlock;

const DEFAULT_RETRIES: u32 = 3;

/// JSON body sent to the upstream. The token ceiling goes out under the
/// field name the provider expects; exactly one of the two is set.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u64>,
}

/// Per-request knobs after defaulting against the model entry.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
    pub max_tokens: u64,
    pub temperature: f64,
    pub timeout: Duration,
    pub retries: u32,
}

/// Apply the defaulting rules: absent or non-positive client values fall
/// back to the model entry (token ceiling, temperature midpoint) or to the
/// gateway-wide defaults (timeout, retries).
pub fn resolve_options(req: &ChatCompletionRequest, entry: &ModelEntry) -> RequestOptions {
    let max_tokens = match req.max_tokens {
        Some(v) if v > 0 => v,
        _ => entry.max_output_tokens,
    };

    let temperature = req
        .temperature
        .unwrap_or_else(|| entry.default_temperature());

    let timeout_secs = match req.timeout {
        Some(v) if v > 0 => v,
        _ => DEFAULT_TIMEOUT_SECS,
    };

    let retries = match req.retries {
        Some(v) if v > 0 => v,
        _ => DEFAULT_RETRIES,
    };

    RequestOptions {
        max_tokens,
        temperature,
        timeout: Duration::from_secs(timeout_secs),
        retries,
    }
}

/// Assemble the outgoing message list and find the prompt to persist.
///
/// Order: memory preamble (if non-empty) as a system turn, then session
/// history in stored order, then the client messages walked in order with
/// every message kept at its position. The returned prompt is the content
/// of the last client message with role `user`.
pub fn build_messages(
    memory: &MemoryBlock,
    history: &[ChatMessage],
    client_messages: &[ChatMessage],
) -> (Vec<ChatMessage>, Option<String>) {
    let mut messages =
        Vec::with_capacity(1 + history.len() + client_messages.len());

    if !memory.content.is_empty() {
        messages.push(ChatMessage::new("system", &memory.content));
    }

    messages.extend_from_slice(history);

    let mut user_prompt = None;
    for msg in client_messages {
        if msg.role == "user" {
            user_prompt = Some(msg.content.clone());
        }
        messages.push(msg.clone());
    }

    (messages, user_prompt)
}

/// Build the upstream payload for a resolved model.
pub fn build_payload(
    entry: &ModelEntry,
    messages: Vec<ChatMessage>,
    options: &RequestOptions,
) -> UpstreamPayload {
    let (max_tokens, max_completion_tokens) = if entry.requires_completion_tokens {
        (None, Some(options.max_tokens))
    } else {
        (Some(options.max_tokens), None)
    };

    UpstreamPayload {
        model: entry.id.clone(),
        messages,
        temperature: options.temperature,
        max_tokens,
        max_completion_tokens,
    }
}
