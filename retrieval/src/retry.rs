//! Bounded timeouts with exponential backoff for external calls.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::Result;
use crate::error::RetrievalErr;

/// Delay before retry `attempt` (0-based): `base_delay * 2^attempt`.
pub fn backoff_delay(config: &RetryConfig, attempt: i32) -> Duration {
    let shift = attempt.clamp(0, 16) as u32;
    Duration::from_millis(config.base_delay_ms.saturating_mul(1u64 << shift))
}

/// Run `call` with a per-attempt timeout, retrying transient failures.
///
/// Non-retryable errors are returned immediately. After `max_retries`
/// retries the last error is returned.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let timeout = Duration::from_millis(config.timeout_ms);
    let max_retries = config.max_retries.max(0);
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalErr::Timeout {
                operation: operation.to_string(),
                timeout_ms: config.timeout_ms,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = backoff_delay(config, attempt);
                tracing::warn!(
                    operation = operation,
                    attempt = attempt + 1,
                    max_retries = max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "External call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        operation = operation,
                        attempts = attempt + 1,
                        error = %e,
                        "External call failed after all retries"
                    );
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
#[path = "retry.test.rs"]
mod tests;
