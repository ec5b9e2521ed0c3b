//! OpenAI-compatible wire types for the gateway surface.
//!
//! The request schema is the OpenAI chat-completion shape plus three gateway
//! extensions: `session_id`, `timeout`, and `retries`. Optional sampling
//! fields are nullable so that an explicit `temperature: 0` is distinguishable
//! from an absent one.

use serde::{Deserialize, Serialize};

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Chat completion request (OpenAI-compatible).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model id or shortcode.
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature. Absent means "use the model default";
    /// an explicit `0` is forwarded as-is.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Output token ceiling. Absent or non-positive falls back to the
    /// model's configured maximum.
    #[serde(default)]
    pub max_tokens: Option<u64>,

    /// **Gateway extension:** session id for short conversational state.
    #[serde(default)]
    pub session_id: Option<String>,

    /// **Gateway extension:** per-request timeout in seconds (default 180).
    #[serde(default)]
    pub timeout: Option<u64>,

    /// **Gateway extension:** retry budget for this request (default 3).
    #[serde(default)]
    pub retries: Option<u32>,
}

/// One completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
}

/// Chat completion response (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
}

/// Error envelope matching the OpenAI error schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Error body carried inside [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        let error_type = error_type.into();
        Self {
            error: ErrorBody {
                message: message.into(),
                code: error_type.clone(),
                error_type,
            },
        }
    }
}

/// Entry of the `GET /v1/models` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelData {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// `GET /v1/models` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelData>,
}
