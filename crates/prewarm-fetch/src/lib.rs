//! Retrying fetch layer.
//!
//! Wraps an arbitrary asynchronous load operation with bounded retries,
//! exponential backoff with jitter, and a hard timeout race per attempt.
//! Pure with respect to shared state: this crate never touches the cache or
//! the preload queue, it is the building block both the on-demand and the
//! speculative call sites share.

mod retry;

pub use retry::{load_with_retry, RetryConfig};
