//! Retry policy for notification dispatch.
//!
//! One policy object is applied uniformly to both channels instead of
//! duplicating backoff math per sender. Only errors the channel itself
//! marks retryable (transport failures, 429/5xx responses) are retried;
//! misconfiguration fails fast.
//!
//! With the defaults (3 attempts, base 2) the delays are 2s after the first
//! failed attempt and 4s after the second; the third failure propagates.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::ChannelError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 2,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_base_secs: config.backoff_base_secs,
        }
    }
}

impl RetryPolicy {
    /// Delay slept after the given 1-based failed attempt: `base^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_base_secs.saturating_pow(attempt))
    }

    /// Drive `op` until it succeeds, exhausts `max_attempts`, or fails with
    /// a non-retryable error.
    pub async fn run<F, Fut>(&self, channel: &str, mut op: F) -> Result<(), ChannelError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), ChannelError>>,
    {
        for attempt in 1..=self.max_attempts {
            let err = match op().await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt == self.max_attempts {
                return Err(err);
            }

            let delay = self.delay_after(attempt);
            warn!(
                channel,
                attempt,
                max_attempts = self.max_attempts,
                error = %err,
                "send failed, retrying in {}s",
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
        }

        unreachable!("max_attempts is validated to be >= 1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transport() -> ChannelError {
        ChannelError::Transport("connection reset".into())
    }

    #[test]
    fn delays_double_from_the_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_sleeping_on_first_attempt() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();

        let result = policy.run("mail", || async { Ok(()) }).await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn two_failures_sleep_two_then_four_seconds() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = policy
            .run("chat", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(transport())
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 2s after attempt 1 plus 4s after attempt 2, nothing after success.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_propagate_the_last_error() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let result = policy
            .run("chat", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(transport()) }
            })
            .await;

        assert!(matches!(result, Err(ChannelError::Transport(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_fast() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = policy
            .run("mail", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ChannelError::Api {
                        status: 400,
                        body: "bad payload".into(),
                        retryable: false,
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(ChannelError::Api { status: 400, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
