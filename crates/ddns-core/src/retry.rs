//! Retry policy for upstream API calls
//!
//! The policy is applied by [`execute_with_policy`], a higher-order wrapper
//! around a closure producing one attempt. Each attempt reports a tagged
//! [`Attempt`] so the transport code decides what is retryable and the
//! wrapper decides how long to wait.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// The call succeeded
    Success(T),
    /// The call failed but another attempt may succeed
    Retryable(Error),
    /// The call failed and retrying cannot help
    Permanent(Error),
}

impl<T> Attempt<T> {
    /// Classify a result using [`Error::is_transient`]
    pub fn classify(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) if err.is_transient() => Self::Retryable(err),
            Err(err) => Self::Permanent(err),
        }
    }
}

/// Linear backoff retry policy
///
/// Before attempt `n + 1` the wrapper sleeps `n * step`, so with the
/// defaults the waits are 1s then 2s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Backoff unit multiplied by the attempt number
    pub step: Duration,
}

impl RetryPolicy {
    /// Default maximum attempts.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Default backoff step (1 second).
    pub const DEFAULT_STEP: Duration = Duration::from_secs(1);

    /// Creates a policy with the default values
    pub const fn new() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            step: Self::DEFAULT_STEP,
        }
    }

    /// Sets the maximum number of attempts (clamped to at least 1)
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Sets the backoff step
    pub const fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
///
/// `op` receives the 1-based attempt number. Permanent failures are returned
/// immediately. When every attempt failed, the last error is returned
/// wrapped with the number of attempts made.
pub async fn execute_with_policy<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Attempt::Success(value) => return Ok(value),
            Attempt::Permanent(err) => return Err(err),
            Attempt::Retryable(err) => {
                if attempt >= max_attempts {
                    return Err(err.context(format!("gave up after {attempt} attempts")));
                }
                let delay = policy.delay_after(attempt);
                warn!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt, max_attempts, err, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result = execute_with_policy(&RetryPolicy::default(), |attempt| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Attempt::Retryable(Error::status(503, "unavailable"))
                } else {
                    Attempt::Success(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s before attempt 2, 2s before attempt 3
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = execute_with_policy(&RetryPolicy::default(), |_| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Attempt::Permanent(Error::status(403, "forbidden"))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Status { status: 403, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wraps_last_error() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = execute_with_policy(&RetryPolicy::default(), |attempt| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Attempt::Retryable(Error::http(format!("timeout #{attempt}")))
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            err.to_string(),
            "gave up after 3 attempts: HTTP error: timeout #3"
        );
    }

    #[test]
    fn test_classify() {
        assert!(matches!(Attempt::classify(Ok(1)), Attempt::Success(1)));
        assert!(matches!(
            Attempt::<()>::classify(Err(Error::status(429, ""))),
            Attempt::Retryable(_)
        ));
        assert!(matches!(
            Attempt::<()>::classify(Err(Error::malformed("x"))),
            Attempt::Permanent(_)
        ));
    }
}
