//! Retry policy for saga activities.
//!
//! Every attempt is bounded by a start-to-close timeout. A failed attempt is
//! retried after an exponentially growing delay until the attempt budget is
//! spent or the error is not retryable.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::error::ActivityError;

/// Timeout and retry settings applied to every activity.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub initial_interval: Duration,
    /// Growth factor applied to the delay after each failed attempt.
    pub backoff_coefficient: f64,
    /// Upper bound on any single delay.
    pub maximum_interval: Duration,
    /// Total attempts, the first one included.
    pub maximum_attempts: u32,
    /// Bound on the duration of a single attempt.
    pub start_to_close_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_time_unit(Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Standard policy expressed in `unit`s: 1 unit initial delay, coefficient
    /// 2.0, 60 unit cap, 3 attempts, 60 unit attempt timeout.
    pub fn with_time_unit(unit: Duration) -> Self {
        Self {
            initial_interval: unit,
            backoff_coefficient: 2.0,
            maximum_interval: unit * 60,
            maximum_attempts: 3,
            start_to_close_timeout: unit * 60,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        if !secs.is_finite() || secs >= self.maximum_interval.as_secs_f64() {
            return self.maximum_interval;
        }
        Duration::from_secs_f64(secs)
    }
}

/// A step that did not produce a result within its retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{last_error} (after {attempts} attempt(s))")]
pub struct StepFailure {
    pub attempts: u32,
    pub last_error: ActivityError,
}

/// Runs `operation` under `policy`.
///
/// The closure receives the 1-based attempt number. Returns the first
/// successful value together with the number of attempts it took.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    step: &'static str,
    mut operation: F,
) -> Result<(T, u32), StepFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ActivityError>>,
{
    let max_attempts = policy.maximum_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        tracing::debug!(step, attempt, max_attempts, "Attempting activity");

        let result = match timeout(policy.start_to_close_timeout, operation(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(ActivityError::Timeout(policy.start_to_close_timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(step, attempt, "Activity succeeded after retry");
                }
                return Ok((value, attempt));
            }
            Err(error) if !error.is_retryable() || attempt >= max_attempts => {
                tracing::error!(step, attempt, error = %error, "Activity failed, giving up");
                return Err(StepFailure {
                    attempts: attempt,
                    last_error: error,
                });
            }
            Err(error) => {
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    step,
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Activity failed, retrying after delay"
                );
                metrics::counter!("saga_step_retries_total", "step" => step).increment(1);
                sleep(delay).await;
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
    fn test_standard_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.backoff_coefficient, 2.0);
        assert_eq!(policy.maximum_interval, Duration::from_secs(60));
        assert_eq!(policy.maximum_attempts, 3);
        assert_eq!(policy.start_to_close_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(7), Duration::from_secs(60));
        assert_eq!(policy.backoff_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_time_unit_scales_policy() {
        let policy = RetryPolicy::with_time_unit(Duration::from_millis(10));
        assert_eq!(policy.maximum_interval, Duration::from_millis(600));
        assert_eq!(policy.start_to_close_timeout, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::default();
        let (value, attempts) = execute_with_retry(&policy, "test", |_| async { Ok::<_, ActivityError>(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_with_backoff() {
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();

        let (value, attempts) = execute_with_retry(&policy, "test", |attempt| async move {
            if attempt < 3 {
                Err(ActivityError::transient("unavailable"))
            } else {
                Ok("done")
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(attempts, 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let failure = execute_with_retry(&policy, "test", |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ActivityError::transient("unavailable"))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(failure.last_error, ActivityError::transient("unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let policy = RetryPolicy::default();
        let failure = execute_with_retry(&policy, "test", |_| async {
            Err::<(), _>(ActivityError::NonRetryable("card reported stolen".into()))
        })
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_failure() {
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();

        let failure = execute_with_retry(&policy, "test", |_| async {
            sleep(Duration::from_secs(120)).await;
            Ok::<_, ActivityError>(())
        })
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.last_error, ActivityError::Timeout(Duration::from_secs(60)));
        // three 60s timeouts plus 1s and 2s of backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(183) && elapsed < Duration::from_millis(183_100));
    }
}
