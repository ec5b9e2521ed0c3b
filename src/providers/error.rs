//! Unified upstream error taxonomy.
//!
//! Every failure in the request pipeline is classified exactly once into an
//! [`ApiError`] and carried unchanged through the circuit breaker and the
//! retry engine. Whether an error counts toward opening a circuit or
//! triggers another attempt is a pure function of its [`ApiErrorKind`].

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Closed error taxonomy for the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Upstream 429.
    RateLimit,
    /// Upstream 401/403.
    AuthFailed,
    /// Transport timeout, upstream 408/504, or local cancellation.
    Timeout,
    /// Upstream 5xx.
    ServerError,
    /// Upstream 4xx other than auth and rate limiting.
    ClientError,
    /// Synthesised by an open circuit breaker.
    CircuitOpen,
    /// Transport failures, malformed upstream bodies, anything unclassified.
    Unexpected,
    /// Requested model is not in the registry.
    ConfigNotFound,
    /// Credential environment variable is unset.
    ApiKeyMissing,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::AuthFailed => "auth_failed",
            Self::Timeout => "timeout",
            Self::ServerError => "server_error",
            Self::ClientError => "client_error",
            Self::CircuitOpen => "circuit_open",
            Self::Unexpected => "api_error",
            Self::ConfigNotFound => "model_not_found",
            Self::ApiKeyMissing => "api_key_missing",
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Timeout | Self::ServerError)
    }
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified pipeline error.
#[derive(Debug, Clone, Error)]
#[error("[{kind}] {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// Upstream HTTP status, when one was received.
    pub status: Option<u16>,
    pub message: String,
    /// Wait hint from an upstream `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::CircuitOpen, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unexpected, message)
    }

    pub fn config_not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ConfigNotFound, message)
    }

    pub fn api_key_missing(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ApiKeyMissing, message)
    }

    /// Classify a transport-level failure. Timeouts are retryable; anything
    /// else on the wire is not.
    pub fn classify_transport(err: &reqwest::Error) -> Self {
        let text = err.to_string();
        if err.is_timeout() || text.contains("timeout") || text.contains("deadline exceeded") {
            Self::new(ApiErrorKind::Timeout, "Request timeout")
        } else {
            Self::new(ApiErrorKind::Unexpected, text)
        }
    }

    /// Classify a non-2xx upstream status.
    pub fn classify_status(
        status: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        let kind = match status {
            429 => ApiErrorKind::RateLimit,
            401 | 403 => ApiErrorKind::AuthFailed,
            408 | 504 => ApiErrorKind::Timeout,
            s if s >= 500 => ApiErrorKind::ServerError,
            s if s >= 400 => ApiErrorKind::ClientError,
            _ => ApiErrorKind::Unexpected,
        };
        Self {
            kind,
            status: Some(status),
            message: message.into(),
            retry_after,
        }
    }

    /// Client-visible HTTP status for this error.
    pub fn http_status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorKind::AuthFailed => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiErrorKind::ServerError | ApiErrorKind::CircuitOpen => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiErrorKind::ClientError | ApiErrorKind::ConfigNotFound => StatusCode::BAD_REQUEST,
            ApiErrorKind::Unexpected | ApiErrorKind::ApiKeyMissing => StatusCode::BAD_GATEWAY,
        }
    }

    /// The `type` value of the client-visible error envelope.
    pub fn client_error_type(&self) -> &'static str {
        match self.kind {
            ApiErrorKind::ApiKeyMissing => "api_error",
            kind => kind.as_str(),
        }
    }
}
