//! Gateway configuration types.
//!
//! Retry and circuit-breaker settings are compiled-in defaults that can be
//! partially overridden per request (`retries`, `timeout`). Logging options
//! come from the CLI.

use serde::{Deserialize, Serialize};

/// Default per-request timeout in seconds when the client does not supply one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Configuration for upstream request retries.
///
/// Retries apply only to errors the classifier marks retryable (rate limits,
/// timeouts, upstream 5xx). Backoff doubles per attempt up to `max_backoff_ms`;
/// a `Retry-After` hint from the upstream overrides the schedule for that
/// single wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial request).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay before the first retry in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Multiplier for exponential backoff.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetryConfig {
    /// Copy of this config with a different retry budget.
    pub fn with_max_retries(&self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self.clone()
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

/// Configuration for the per-model circuit breaker.
///
/// Failures are counted in a sliding time window; crossing `threshold`
/// opens the circuit for `cooldown_secs`, after which a bounded number of
/// probe requests decides between closing and re-opening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Retryable failures within the window before the circuit opens.
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Sliding window for failure accounting, in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Time an open circuit rejects traffic before probing, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Maximum trial calls admitted while half-open.
    #[serde(default = "default_half_open_max")]
    pub half_open_max: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            window_secs: default_window_secs(),
            cooldown_secs: default_cooldown_secs(),
            half_open_max: default_half_open_max(),
        }
    }
}

fn default_threshold() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    10
}

fn default_half_open_max() -> u32 {
    3
}

/// Console log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}
