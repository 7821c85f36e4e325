//! Retry wrapper for store calls
//!
//! Transient failures (connection, timeout, unavailable) are retried with a
//! fixed or exponential delay; anything else fails on the first attempt.
//! Each attempt runs under an optional timeout so a hung call counts as a
//! transient failure instead of blocking the caller.
//!
//! [`retry_when`] narrows which errors are retried, for writes that must not
//! run twice when an attempt's outcome is unknown.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use folio_core::{BackoffKind, RetryConfig};

use crate::error::Retryable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential { max_delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; never below 1
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
    /// Randomize each delay within [delay/2, delay]
    pub jitter: bool,
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        let backoff = match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                max_delay: Duration::from_millis(config.max_delay_ms),
            },
        };
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
            backoff,
            jitter: config.jitter,
            attempt_timeout: (config.attempt_timeout_ms > 0)
                .then(|| Duration::from_millis(config.attempt_timeout_ms)),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no timeout
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
            jitter: false,
            attempt_timeout: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delay before attempt `attempt + 1`, `attempt` being 1-based.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor).min(max_delay)
            }
        };
        if self.jitter && !base.is_zero() {
            let half = base / 2;
            half + rand::thread_rng().gen_range(Duration::ZERO..=half)
        } else {
            base
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the attempt
/// budget runs out. The last error is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, op: &str, operation: F) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_when(policy, op, E::is_transient, operation).await
}

/// Like [`retry`], but only errors accepted by `should_retry` get another
/// attempt.
pub async fn retry_when<T, E, P, F, Fut>(
    policy: &RetryPolicy,
    op: &str,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable,
    P: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(limit)),
            },
            None => operation().await,
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    op,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "store call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::store::{StoreError, StoreErrorKind};

    fn transient() -> StoreError {
        StoreError::new(StoreErrorKind::Connection, "connection reset")
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result = retry(&policy, "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < policy.max_attempts {
                Err(transient())
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_and_returns_last_error() {
        let policy = RetryPolicy::default().with_max_attempts(4);
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = retry(&policy, "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(StoreError::new(StoreErrorKind::Unavailable, format!("attempt {n}")))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err().message, "attempt 4");
        // three fixed 1s waits between four attempts
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_fail_fast() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry(&policy, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::constraint("duplicate key"))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, StoreErrorKind::Constraint);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempts_time_out_and_retry() {
        let policy = RetryPolicy::default()
            .with_max_attempts(2)
            .with_attempt_timeout(Some(Duration::from_millis(50)));
        let calls = AtomicU32::new(0);

        let result = retry(&policy, "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                std::future::pending::<()>().await;
            }
            Ok::<_, StoreError>(n)
        })
        .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn final_timeout_surfaces_as_timeout_error() {
        let policy = RetryPolicy::none().with_attempt_timeout(Some(Duration::from_millis(50)));

        let result: Result<(), StoreError> = retry(&policy, "test", || async {
            std::future::pending::<Result<(), StoreError>>().await
        })
        .await;

        assert_eq!(result.unwrap_err().kind, StoreErrorKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn narrowed_retry_skips_rejected_errors() {
        let policy = RetryPolicy::default().with_attempt_timeout(Some(Duration::from_millis(50)));
        let calls = AtomicU32::new(0);
        let not_timeout = |err: &StoreError| err.is_transient() && err.kind != StoreErrorKind::Timeout;

        let result: Result<(), StoreError> = retry_when(&policy, "test", not_timeout, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<Result<(), StoreError>>().await
        })
        .await;
        assert_eq!(result.unwrap_err().kind, StoreErrorKind::Timeout);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Other transient errors still get the full budget
        calls.store(0, Ordering::SeqCst);
        let result: Result<(), StoreError> = retry_when(&policy, "test", not_timeout, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), policy.max_attempts);
    }

    #[test]
    fn exponential_delay_is_capped() {
        let policy = RetryPolicy {
            backoff: Backoff::Exponential {
                max_delay: Duration::from_millis(3000),
            },
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(3000));
        assert_eq!(policy.delay_after(10), Duration::from_millis(3000));
    }

    #[test]
    fn jitter_stays_within_half_to_full_delay() {
        let policy = RetryPolicy {
            jitter: true,
            ..RetryPolicy::default()
        };
        for attempt in 1..20 {
            let delay = policy.delay_after(attempt);
            assert!(delay >= Duration::from_millis(500) && delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn zero_timeout_in_config_disables_it() {
        let config = RetryConfig {
            attempt_timeout_ms: 0,
            max_attempts: 0,
            ..RetryConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.attempt_timeout, None);
        assert_eq!(policy.max_attempts, 1);
    }
}
