//! Token-bucket throttle for embedding calls.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::debug;

use crate::error::{ConfigError, IngestError};
use crate::models::IngestionConfig;
use crate::utils::CancelToken;

/// `calls` may go out back to back; after that one call is released per
/// `window`. No half-open window of length `window` ever sees more than `calls`.
pub fn embedding_quota(calls: u32, window: Duration) -> Option<Quota> {
    let burst = NonZeroU32::new(calls)?;
    Some(Quota::with_period(window)?.allow_burst(burst))
}

/// Process-wide limiter shared by every embedding call of the pipeline.
pub struct EmbeddingRateLimiter {
    limiter: DefaultDirectRateLimiter,
}

impl EmbeddingRateLimiter {
    pub fn new(calls: u32, window: Duration) -> Result<Self, ConfigError> {
        let quota = embedding_quota(calls, window).ok_or_else(|| {
            ConfigError::ValidationError(
                "rate limit needs a positive call count and window".to_string(),
            )
        })?;
        Ok(Self {
            limiter: RateLimiter::direct(quota),
        })
    }

    pub fn from_config(config: &IngestionConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.calls_per_window,
            Duration::from_secs(config.window_secs),
        )
    }

    /// Wait for a free slot. Suspends rather than failing; only cancellation ends
    /// the wait early.
    pub async fn acquire(&self, cancel: &CancelToken) -> Result<(), IngestError> {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        if self.limiter.check().is_ok() {
            return Ok(());
        }

        debug!("embedding rate limit reached, waiting");
        let mut cancel = cancel.clone();
        tokio::select! {
            _ = self.limiter.until_ready() => Ok(()),
            _ = cancel.cancelled() => Err(IngestError::Cancelled),
        }
    }
}
