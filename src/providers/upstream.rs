//! One-shot HTTP call to an upstream provider.
//!
//! The payload arrives pre-serialized so retries clone bytes instead of
//! re-serializing the request struct. Auth headers and response extraction
//! follow the provider's wire format; any caller-supplied extra headers are
//! applied last.

use std::time::{Duration, Instant};

use http::header::{CONTENT_TYPE, RETRY_AFTER};
use tracing::{debug, error};

use super::error::ApiError;
use super::{ProviderConfig, ProviderKind};

/// Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// POST the payload to the provider and extract the assistant text.
pub async fn call_upstream(
    client: &reqwest::Client,
    cfg: &ProviderConfig,
    body: &[u8],
    timeout: Duration,
) -> Result<String, ApiError> {
    let start = Instant::now();
    debug!(endpoint = %cfg.endpoint, model = %cfg.model, "sending upstream request");

    let mut request = client
        .post(&cfg.endpoint)
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout);

    request = match cfg.kind {
        ProviderKind::AnthropicStyle => request
            .header("x-api-key", &cfg.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION),
        ProviderKind::OpenAiStyle => {
            request.header("Authorization", format!("Bearer {}", cfg.api_key))
        }
        ProviderKind::OllamaStyle => request,
    };

    for (name, value) in &cfg.headers {
        request = request.header(name, value);
    }

    let response = request.body(body.to_vec()).send().await.map_err(|err| {
        error!(endpoint = %cfg.endpoint, error = %err, "upstream request failed");
        ApiError::classify_transport(&err)
    })?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.unwrap_or_default();
        error!(
            endpoint = %cfg.endpoint,
            model = %cfg.model,
            status = status.as_u16(),
            body = %body,
            "upstream returned error status"
        );
        return Err(ApiError::classify_status(status.as_u16(), body, retry_after));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| ApiError::classify_transport(&err))?;

    debug!(
        size_bytes = bytes.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "upstream response received"
    );

    extract_completion(cfg.kind, &bytes)
}

/// Pull the assistant text out of a 2xx response body.
fn extract_completion(kind: ProviderKind, body: &[u8]) -> Result<String, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| ApiError::unexpected(format!("failed to parse upstream response: {err}")))?;

    // Some providers report errors inside a 2xx body.
    if let Some(message) = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        error!(api_error = %message, "error object in upstream response");
        return Err(ApiError::unexpected(message.to_string()));
    }

    if kind == ProviderKind::AnthropicStyle {
        if let Some(text) = value["content"][0]["text"].as_str() {
            return Ok(text.to_string());
        }
    }

    if let Some(content) = value["choices"][0]["message"]["content"].as_str() {
        return Ok(content.to_string());
    }

    error!("unexpected upstream response format");
    Err(ApiError::unexpected("unexpected response format"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::providers::error::ApiErrorKind;

    fn config(kind: ProviderKind, endpoint: String, api_key: &str) -> ProviderConfig {
        ProviderConfig {
            endpoint,
            model: "test-model".to_string(),
            api_key: api_key.to_string(),
            kind,
            headers: HashMap::new(),
        }
    }

    #[test]
    fn test_extract_openai_shape() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":"Hallo"}}]}"#;
        let text = extract_completion(ProviderKind::OpenAiStyle, body).unwrap();
        assert_eq!(text, "Hallo");
    }

    #[test]
    fn test_extract_anthropic_shape() {
        let body = br#"{"content":[{"type":"text","text":"hi"}]}"#;
        let text = extract_completion(ProviderKind::AnthropicStyle, body).unwrap();
        assert_eq!(text, "hi");
    }

    #[test]
    fn test_extract_error_object_in_2xx_body() {
        let body = br#"{"error":{"message":"quota exhausted"}}"#;
        let err = extract_completion(ProviderKind::OpenAiStyle, body).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unexpected);
        assert_eq!(err.message, "quota exhausted");
    }

    #[test]
    fn test_extract_unknown_shape() {
        let body = br#"{"something":"else"}"#;
        let err = extract_completion(ProviderKind::OpenAiStyle, body).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unexpected);
        assert_eq!(err.message, "unexpected response format");
    }

    #[tokio::test]
    async fn test_bearer_auth_header_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sekrit"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(
            ProviderKind::OpenAiStyle,
            format!("{}/v1/chat/completions", server.uri()),
            "sekrit",
        );
        let body = serde_json::to_vec(&serde_json::json!({"model": "test-model"})).unwrap();

        let client = reqwest::Client::new();
        let text = call_upstream(&client, &cfg, &body, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_anthropic_headers_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "hi"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(
            ProviderKind::AnthropicStyle,
            format!("{}/v1/messages", server.uri()),
            "sk-ant",
        );

        let client = reqwest::Client::new();
        let text = call_upstream(&client, &cfg, b"{}", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "hi");
    }

    #[tokio::test]
    async fn test_keyless_request_has_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "local"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(ProviderKind::OllamaStyle, server.uri(), "");
        let client = reqwest::Client::new();
        let text = call_upstream(&client, &cfg, b"{}", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "local");

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("Authorization").is_none());
        assert!(requests[0].headers.get("x-api-key").is_none());
    }

    #[tokio::test]
    async fn test_error_status_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "7")
                    .set_body_string("rate limited"),
            )
            .mount(&server)
            .await;

        let cfg = config(ProviderKind::OpenAiStyle, server.uri(), "k");
        let client = reqwest::Client::new();
        let err = call_upstream(&client, &cfg, b"{}", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ApiErrorKind::RateLimit);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
        assert_eq!(err.message, "rate limited");
    }

    #[tokio::test]
    async fn test_server_error_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let cfg = config(ProviderKind::OpenAiStyle, server.uri(), "k");
        let client = reqwest::Client::new();
        let err = call_upstream(&client, &cfg, b"{}", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::ServerError);
        assert!(err.retryable());
    }

    #[tokio::test]
    async fn test_extra_headers_applied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-extra", "yes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut cfg = config(ProviderKind::OpenAiStyle, server.uri(), "k");
        cfg.headers.insert("x-extra".to_string(), "yes".to_string());

        let client = reqwest::Client::new();
        call_upstream(&client, &cfg, b"{}", Duration::from_secs(5))
            .await
            .unwrap();
    }
}
