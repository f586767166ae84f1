//! Bounded retry with a per-attempt timeout budget.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Per-attempt timeout that grows with the attempt index: `base + step * index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTimeout {
    pub base: Duration,
    pub step: Duration,
}

impl AttemptTimeout {
    /// Timeout budget for the zero-based attempt `index`.
    pub fn for_attempt(&self, index: u32) -> Duration {
        self.base + self.step * index
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Optional timeout applied to every attempt.
    pub attempt_timeout: Option<AttemptTimeout>,
}

impl RetryConfig {
    /// Back-to-back attempts with no timeout.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempt_timeout: None,
        }
    }

    /// Retry policy used for embedding calls: up to `max_attempts` back-to-back
    /// attempts, each with a timeout of `base + step * attempt`.
    #[must_use]
    pub fn embedding(max_attempts: u32, base: Duration, step: Duration) -> Self {
        Self {
            max_attempts,
            attempt_timeout: Some(AttemptTimeout { base, step }),
        }
    }
}

/// Retry result indicating what happened.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all retries.
    Failed { last_error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    /// Convert to a Result, discarding retry information.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed { last_error, .. } => Err(last_error),
        }
    }
}

/// Determines if an error is retryable.
pub trait Retryable {
    /// Returns true if the operation should be retried.
    fn is_retryable(&self) -> bool;
}

/// Execute an async operation with bounded retry.
///
/// A timed-out attempt is turned into `E` through `From<Elapsed>` and is retried
/// like any other transient failure. Failures after the first attempt are logged.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> RetryResult<T, E>
where
    E: Retryable + std::fmt::Display + From<tokio::time::error::Elapsed>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_gated_retry(config, || async { Ok::<(), E>(()) }, operation).await
}

/// Like [`with_retry`], but `gate` is awaited before every attempt, retries
/// included. The gate runs outside the attempt timeout, and a gate error ends
/// the loop without counting as an attempt.
pub async fn with_gated_retry<T, E, G, GFut, F, Fut>(
    config: &RetryConfig,
    mut gate: G,
    mut operation: F,
) -> RetryResult<T, E>
where
    E: Retryable + std::fmt::Display + From<tokio::time::error::Elapsed>,
    G: FnMut() -> GFut,
    GFut: Future<Output = Result<(), E>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;

    loop {
        if let Err(error) = gate().await {
            return RetryResult::Failed {
                last_error: error,
                attempts,
            };
        }

        let outcome = match config.attempt_timeout {
            Some(budget) => match timeout(budget.for_attempt(attempts), operation()).await {
                Ok(result) => result,
                Err(elapsed) => Err(E::from(elapsed)),
            },
            None => operation().await,
        };
        attempts += 1;

        match outcome {
            Ok(value) => return RetryResult::Success(value),
            Err(error) => {
                if attempts > 1 {
                    warn!(attempt = attempts, error = %error, "attempt failed");
                }

                if attempts >= config.max_attempts || !error.is_retryable() {
                    return RetryResult::Failed {
                        last_error: error,
                        attempts,
                    };
                }
            }
        }
    }
}
