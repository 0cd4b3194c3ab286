//! Bounded retry with exponential backoff for outbound model calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::LlmError;

/// Retry configuration for one outbound call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (2 means 3 attempts total).
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each retry after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Run `operation` up to `1 + max_retries` times, sleeping between attempts
/// with a doubling delay. Only transport-class errors are retried; anything
/// else returns after the first failure. The sleep suspends only this task.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut remaining = policy.max_retries;
    let mut delay = policy.base_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || remaining == 0 {
                    return Err(err);
                }
                warn!(
                    error = %err,
                    remaining,
                    delay_ms = delay.as_millis() as u64,
                    "transient backend failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                remaining -= 1;
            }
        }
    }
}
