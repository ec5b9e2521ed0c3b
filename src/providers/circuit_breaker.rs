//! Circuit breaker for upstream model endpoints.
//!
//! One breaker per model key tracks retryable failures in a sliding time
//! window and temporarily rejects traffic after a threshold is exceeded.
//!
//! # States
//!
//! - **Closed**: normal operation. Retryable failures are timestamped; the
//!   window is purged on every pass.
//! - **Open**: the threshold was crossed. Calls are rejected at O(1) cost
//!   until `cooldown_secs` has elapsed.
//! - **Half-open**: probation after cooldown. At most `half_open_max` trial
//!   calls are admitted; one success closes the circuit, one retryable
//!   failure re-opens it.
//!
//! Non-retryable errors (client mistakes, auth failures) pass through
//! without touching the failure window, so a misbehaving client cannot
//! poison a healthy upstream's reputation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use super::error::ApiError;
use crate::config::CircuitBreakerConfig;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

struct BreakerInner {
    state: CircuitState,
    /// Timestamps of retryable failures inside the window.
    failures: Vec<Instant>,
    half_open_attempts: u32,
    last_state_change: Instant,
    last_state_change_at: DateTime<Utc>,
}

impl BreakerInner {
    fn set_state(&mut self, state: CircuitState) {
        self.state = state;
        self.last_state_change = Instant::now();
        self.last_state_change_at = Utc::now();
    }

    fn purge_old_failures(&mut self, window: Duration) {
        let now = Instant::now();
        self.failures
            .retain(|t| now.duration_since(*t) < window);
    }
}

/// Per-model circuit breaker guarding one upstream.
pub struct CircuitBreaker {
    model: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

/// Snapshot of breaker internals for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerDetails {
    pub state: &'static str,
    pub failures: usize,
    pub threshold: u32,
    pub window_seconds: u64,
    pub cooldown_seconds: u64,
    pub half_open_max: u32,
    pub half_open_attempts: u32,
    /// ISO-8601 time of the last state transition.
    pub last_state_change: String,
}

impl CircuitBreaker {
    pub fn new(model: impl Into<Arc<str>>, config: &CircuitBreakerConfig) -> Self {
        Self {
            model: model.into(),
            config: config.clone(),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: Vec::new(),
                half_open_attempts: 0,
                last_state_change: Instant::now(),
                last_state_change_at: Utc::now(),
            }),
        }
    }

    /// Model key this breaker guards.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Execute `work` under the breaker's admission control.
    ///
    /// The internal mutex is held only while deciding admission and while
    /// recording the outcome, never across the await.
    pub async fn run<T, F, Fut>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.admit()?;

        let result = work().await;

        match &result {
            Ok(_) => self.record_success(),
            Err(err) => self.record_failure(err),
        }

        result
    }

    /// Admission decision. Handles the open-to-half-open transition and the
    /// half-open probe budget, and purges stale window entries.
    fn admit(&self) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let cooldown = Duration::from_secs(self.config.cooldown_secs);
            if inner.last_state_change.elapsed() >= cooldown {
                info!(
                    model = %self.model,
                    previous_failures = inner.failures.len(),
                    "circuit breaker entering half-open"
                );
                inner.set_state(CircuitState::HalfOpen);
                inner.half_open_attempts = 0;
            } else {
                return Err(ApiError::circuit_open(format!(
                    "circuit breaker open for model '{}'",
                    self.model
                )));
            }
        }

        if inner.state == CircuitState::HalfOpen {
            if inner.half_open_attempts >= self.config.half_open_max {
                return Err(ApiError::circuit_open(format!(
                    "circuit breaker half-open for model '{}', trial budget exhausted",
                    self.model
                )));
            }
            inner.half_open_attempts += 1;
        }

        inner.purge_old_failures(Duration::from_secs(self.config.window_secs));
        Ok(())
    }

    /// Record a failed call. Only retryable errors count toward the window;
    /// any retryable failure while half-open re-opens immediately.
    fn record_failure(&self, err: &ApiError) {
        if !err.retryable() {
            return;
        }

        let mut inner = self.inner.lock();
        inner.failures.push(Instant::now());

        if inner.failures.len() >= self.config.threshold as usize {
            if inner.state != CircuitState::Open {
                warn!(
                    model = %self.model,
                    failures = inner.failures.len(),
                    threshold = self.config.threshold,
                    "circuit breaker opened"
                );
                inner.set_state(CircuitState::Open);
            }
        } else if inner.state == CircuitState::HalfOpen {
            warn!(model = %self.model, "circuit breaker re-opened from half-open");
            inner.set_state(CircuitState::Open);
        }
    }

    /// Record a successful call. A half-open success closes the circuit and
    /// empties the window.
    fn record_success(&self) {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::HalfOpen => {
                info!(model = %self.model, "circuit breaker closed (recovered)");
                inner.set_state(CircuitState::Closed);
                inner.failures.clear();
            }
            CircuitState::Closed => {
                inner.purge_old_failures(Duration::from_secs(self.config.window_secs));
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Whether the breaker currently sheds traffic. An open breaker whose
    /// cooldown has elapsed reports false: the next call would probe.
    pub fn is_open(&self) -> bool {
        if self.state() != CircuitState::Open {
            return false;
        }
        let inner = self.inner.lock();
        inner.last_state_change.elapsed() < Duration::from_secs(self.config.cooldown_secs)
    }

    /// Retryable failures currently inside the window.
    pub fn failure_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.purge_old_failures(Duration::from_secs(self.config.window_secs));
        inner.failures.len()
    }

    /// Snapshot for the health endpoint.
    pub fn details(&self) -> CircuitBreakerDetails {
        let mut inner = self.inner.lock();
        inner.purge_old_failures(Duration::from_secs(self.config.window_secs));

        CircuitBreakerDetails {
            state: inner.state.as_str(),
            failures: inner.failures.len(),
            threshold: self.config.threshold,
            window_seconds: self.config.window_secs,
            cooldown_seconds: self.config.cooldown_secs,
            half_open_max: self.config.half_open_max,
            half_open_attempts: inner.half_open_attempts,
            last_state_change: inner
                .last_state_change_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}
