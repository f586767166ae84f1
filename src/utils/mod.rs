//! Utility modules.

pub mod cancel;
pub mod retry;
pub mod text;

pub use cancel::{CancelHandle, CancelToken};
pub use retry::{
    AttemptTimeout, RetryConfig, RetryResult, Retryable, with_gated_retry, with_retry,
};
pub use text::{display_name, has_meaningful_content, resolve_secret};
