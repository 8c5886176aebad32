use std::future::Future;
use std::time::Duration;

use crate::error::MemoryError;

/// Bounded retry for calls to external services.
///
/// Each attempt runs under `attempt_timeout`. Only transient failures
/// (see [`MemoryError::is_transient`]) are retried; anything else is
/// returned from the attempt that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// A single attempt with the given timeout.
    pub fn once(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            attempt_timeout,
        }
    }

    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, MemoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MemoryError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(MemoryError::Timeout {
                    operation,
                    after: self.attempt_timeout,
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    tracing::warn!(operation, attempt, max_attempts = attempts, error = %err, "retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
