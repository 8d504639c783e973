//! Retry with exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use crate::error::SwitchboardError;

/// Retry policy: bounded attempts, base delay doubling each attempt, capped
/// at a maximum delay. Only errors the taxonomy marks retryable (rate
/// limits) are retried; everything else propagates immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Execute an async operation with retry.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, SwitchboardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SwitchboardError>>,
    {
        let mut backoff = self.initial_backoff;

        for attempt in 1..=self.max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.max_attempts {
                        return Err(e);
                    }

                    // Honor a server-provided retry-after when it is longer
                    // than the scheduled backoff.
                    let delay = match e {
                        SwitchboardError::RateLimited {
                            retry_after_ms: Some(ms),
                        } => backoff.max(Duration::from_millis(ms)),
                        _ => backoff,
                    };

                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after rate limit"
                    );
                    tokio::time::sleep(delay).await;

                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }

        unreachable!("loop returns on success or final error");
    }
}
