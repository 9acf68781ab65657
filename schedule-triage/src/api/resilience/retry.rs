//! Retry policy for rate-limited Intercom requests
//!
//! Only the rate-limited condition is retried. Every other failure, and the
//! last rate-limited response once attempts run out, goes back to the caller.

use chrono::{DateTime, Utc};
use log::warn;
use std::future::Future;
use std::time::Duration;

use crate::api::error::LookupError;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Linear backoff step used when the server gives no reset time
    pub backoff_unit: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6, // first try + 5 retries
            backoff_unit: Duration::from_millis(3000),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_unit: Duration::ZERO,
        }
    }
}

/// Applies a [`RetryConfig`] to async operations
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Wait before retry number `attempt` (1-based).
    ///
    /// With a server reset time the wait is `max(0, reset_at - now)`,
    /// otherwise `attempt * backoff_unit`.
    pub fn delay_for(
        &self,
        attempt: u32,
        reset_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Duration {
        match reset_at {
            Some(reset_at) => (reset_at - now).to_std().unwrap_or(Duration::ZERO),
            None => self.config.backoff_unit.saturating_mul(attempt),
        }
    }

    /// Run `operation`, retrying while it reports a rate limit
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, LookupError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Err(LookupError::RateLimited { reset_at }) if attempt < max_attempts => {
                    let delay = self.delay_for(attempt, reset_at, Utc::now());
                    warn!(
                        "{}: rate limited, retry {}/{} in {:?}",
                        label,
                        attempt,
                        max_attempts - 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts,
            backoff_unit: Duration::ZERO,
        })
    }

    #[test]
    fn test_delay_linear_without_reset() {
        let policy = RetryPolicy::default();
        let now = Utc::now();
        assert_eq!(policy.delay_for(1, None, now), Duration::from_secs(3));
        assert_eq!(policy.delay_for(3, None, now), Duration::from_secs(9));
    }

    #[test]
    fn test_delay_uses_reset_time() {
        let policy = RetryPolicy::default();
        let now = Utc::now();

        let future_reset = now + chrono::Duration::seconds(7);
        assert_eq!(policy.delay_for(4, Some(future_reset), now), Duration::from_secs(7));

        // A reset time in the past means retry immediately
        let past_reset = now - chrono::Duration::seconds(30);
        assert_eq!(policy.delay_for(1, Some(past_reset), now), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let policy = instant_policy(3);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute("test", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, LookupError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let policy = instant_policy(5);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute("test", || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(LookupError::RateLimited { reset_at: None })
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = instant_policy(4);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute("test", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(LookupError::RateLimited {
                        reset_at: Some(Utc::now() - chrono::Duration::seconds(1)),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(LookupError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let policy = instant_policy(5);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute("test", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(LookupError::Status {
                        status: 401,
                        message: "unauthorized".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(LookupError::Status { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
