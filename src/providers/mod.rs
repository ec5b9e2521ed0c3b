//! Upstream provider plumbing.
//!
//! A resolved [`ProviderConfig`] carries everything one upstream call needs:
//! endpoint, canonical model name, credential, and the wire format implied
//! by the two. Requests flow through the retry engine, which wraps the
//! per-model circuit breaker, which wraps the one-shot upstream caller.

pub mod circuit_breaker;
pub mod compose;
pub mod error;
pub mod registry;
pub mod retry;
pub mod upstream;

use std::collections::HashMap;

pub use error::{ApiError, ApiErrorKind};
pub use registry::CircuitBreakerRegistry;

use crate::catalog::ModelEntry;

/// Wire format of an upstream provider. Decides the auth header shape and
/// how the completion text is extracted from the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// `Authorization: Bearer`, completion at `choices[0].message.content`.
    OpenAiStyle,
    /// `x-api-key` + `anthropic-version`, completion at `content[0].text`.
    AnthropicStyle,
    /// No auth header; response is OpenAI-shaped.
    OllamaStyle,
}

impl ProviderKind {
    /// Derive the kind from endpoint and credential. Anthropic endpoints
    /// are recognised by hostname; a missing credential means a local
    /// keyless daemon.
    pub fn detect(endpoint: &str, api_key: &str) -> Self {
        if endpoint.contains("anthropic") {
            ProviderKind::AnthropicStyle
        } else if api_key.is_empty() {
            ProviderKind::OllamaStyle
        } else {
            ProviderKind::OpenAiStyle
        }
    }
}

/// Everything needed for one upstream exchange.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    /// Canonical model name sent to the upstream.
    pub model: String,
    /// Empty for keyless providers.
    pub api_key: String,
    pub kind: ProviderKind,
    /// Extra headers applied after the auth headers.
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Resolve a catalogue entry into a callable provider config, reading
    /// the credential from the process environment.
    pub fn resolve(entry: &ModelEntry) -> Result<Self, ApiError> {
        let api_key = if entry.apikey_env.is_empty() {
            String::new()
        } else {
            std::env::var(&entry.apikey_env)
                .ok()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| {
                    ApiError::api_key_missing(format!(
                        "API key environment variable '{}' is not set",
                        entry.apikey_env
                    ))
                })?
        };

        let kind = ProviderKind::detect(&entry.endpoint, &api_key);

        Ok(Self {
            endpoint: entry.endpoint.clone(),
            model: entry.id.clone(),
            api_key,
            kind,
            headers: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_anthropic_by_endpoint() {
        assert_eq!(
            ProviderKind::detect("https://api.anthropic.com/v1/messages", "sk-ant-x"),
            ProviderKind::AnthropicStyle
        );
    }

    #[test]
    fn test_detect_keyless_is_ollama() {
        assert_eq!(
            ProviderKind::detect("http://localhost:11434/v1/chat/completions", ""),
            ProviderKind::OllamaStyle
        );
    }

    #[test]
    fn test_detect_default_is_openai() {
        assert_eq!(
            ProviderKind::detect("https://api.moonshot.ai/v1/chat/completions", "key"),
            ProviderKind::OpenAiStyle
        );
        assert_eq!(
            ProviderKind::detect("https://api.z.ai/api/paas/v4/chat/completions", "key"),
            ProviderKind::OpenAiStyle
        );
    }
}
