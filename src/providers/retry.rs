//! Bounded retry with exponential backoff, shared by all provider adapters

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::Result;

/// Retry policy parameterized by max attempts and base delay
///
/// Retries only errors classified as transient (`Error::is_transient`);
/// logic errors are returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a new policy
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Run an operation, retrying transient failures with exponential backoff
    pub async fn run<F, Fut, T>(&self, what: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        what,
                        attempt,
                        self.max_attempts,
                        delay,
                        e
                    );
                    last_error = Some(e);
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        // Unreachable unless max_attempts is 0, which new() prevents.
        Err(last_error.unwrap_or_else(|| crate::error::Error::internal("retry loop exhausted")))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay())
    }
}
