//! Retry loop with exponential backoff.
//!
//! The loop only repeats work whose failure the classifier marked
//! retryable. A `Retry-After` hint from a rate-limited upstream overrides
//! the local schedule for that single wait; the schedule itself still
//! advances, so the next backoff continues from where it would have been.
//! Waits race against the caller's cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{ApiError, ApiErrorKind};
use crate::config::RetryConfig;

/// Run `work` up to `max_retries + 1` times.
///
/// Returns the first success, the first non-retryable error, or the error
/// of the final attempt. Cancellation during a backoff wait yields a
/// Timeout error naming the cause.
pub async fn retry_with_backoff<T, F, Fut>(
    cancel: &CancellationToken,
    config: &RetryConfig,
    mut work: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_backoff = Duration::from_millis(config.max_backoff_ms);
    let mut backoff = Duration::from_millis(config.initial_backoff_ms);

    for attempt in 0..=config.max_retries {
        let err = match work().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if attempt == config.max_retries {
            return Err(err);
        }

        if !err.retryable() {
            debug!(
                kind = %err.kind,
                attempt = attempt + 1,
                "retry skipped (non-retryable error)"
            );
            return Err(err);
        }

        // A rate-limit hint wins this wait only; the schedule still advances.
        let sleep = match (err.kind, err.retry_after) {
            (ApiErrorKind::RateLimit, Some(hint)) if hint > Duration::ZERO => hint,
            _ => backoff,
        };

        debug!(
            kind = %err.kind,
            attempt = attempt + 1,
            max_retries = config.max_retries,
            sleep_ms = sleep.as_millis() as u64,
            "retrying after error"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ApiError::timeout("request cancelled during retry backoff"));
            }
            _ = tokio::time::sleep(sleep) => {}
        }

        backoff = backoff.mul_f64(config.backoff_factor).min(max_backoff);
    }

    unreachable!("retry loop should have returned")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 5_000,
            backoff_factor: 2.0,
        }
    }

    fn server_error() -> ApiError {
        ApiError::classify_status(500, "boom", None)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let result: Result<i32, ApiError> = retry_with_backoff(&cancel, &fast_config(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retries() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let result: Result<i32, ApiError> = retry_with_backoff(&cancel, &fast_config(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_last_error() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let result: Result<(), ApiError> = retry_with_backoff(&cancel, &fast_config(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ApiErrorKind::ServerError);
        // max_retries = 3 means 4 total invocations.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_is_returned_after_one_attempt() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let result: Result<(), ApiError> = retry_with_backoff(&cancel, &fast_config(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::classify_status(400, "bad", None)) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ApiErrorKind::ClientError);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_overrides_single_wait_and_schedule_advances() {
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        // Attempt 1: 429 with Retry-After 2s (beats the 500ms schedule).
        // Attempt 2: 500 (waits the advanced 1s backoff, not 500ms).
        // Attempt 3: success.
        let result: Result<(), ApiError> =
            retry_with_backoff(&cancel, &fast_config().with_max_retries(2), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => Err(ApiError::classify_status(
                            429,
                            "slow down",
                            Some(Duration::from_secs(2)),
                        )),
                        1 => Err(server_error()),
                        _ => Ok(()),
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_caps_at_max() {
        let cancel = CancellationToken::new();
        let config = RetryConfig {
            max_retries: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 1_000,
            backoff_factor: 2.0,
        };
        let start = tokio::time::Instant::now();

        let result: Result<(), ApiError> =
            retry_with_backoff(&cancel, &config, || async { Err(server_error()) }).await;

        assert!(result.is_err());
        // Waits: 500ms, then 1s capped four times.
        assert_eq!(start.elapsed(), Duration::from_millis(4_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_yields_timeout() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = AtomicU32::new(0);

        let result: Result<(), ApiError> = retry_with_backoff(&cancel, &fast_config(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Timeout);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
