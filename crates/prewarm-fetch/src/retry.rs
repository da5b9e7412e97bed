//! Retry loop with per-attempt timeout racing.

use std::future::Future;
use std::time::Duration;

use prewarm_types::{LoadError, LoadResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total fetch attempts (not additional retries). Default: 3
    pub retries: u32,
    /// Hard deadline each attempt races against. Default: 10s
    pub timeout: Duration,
    /// Backoff before retry N is `base_backoff * 2^(N-1)` plus jitter.
    /// Default: 1s
    pub base_backoff: Duration,
    /// Cap on the exponential term. Default: 30s
    pub max_backoff: Duration,
    /// Whether to add random jitter to each backoff. Disable for
    /// deterministic tests. Default: true
    pub jitter: bool,
    /// Upper bound of the uniform jitter term. Default: 1s
    pub jitter_max: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout: Duration::from_secs(10),
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: true,
            jitter_max: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Backoff to sleep after failed attempt `attempt` (zero-based), before
    /// the next one.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let shift = attempt.min(16);
        let exp_ms = (self.base_backoff.as_millis() as u64).saturating_mul(1u64 << shift);
        let mut backoff = Duration::from_millis(exp_ms).min(self.max_backoff);
        if self.jitter {
            let jitter_ms = (rand::random::<f64>() * self.jitter_max.as_millis() as f64) as u64;
            backoff += Duration::from_millis(jitter_ms);
        }
        backoff
    }
}

/// Run `fetch` up to `config.retries` times, racing every attempt against
/// `config.timeout`.
///
/// A lost race is treated like a transient failure and retried; the losing
/// future is dropped on our side, not cancelled at the transport. Between
/// attempts the task sleeps an exponentially growing, jittered backoff. On
/// exhaustion the *last* error is returned unchanged, so callers can still
/// tell a timeout from a fetch failure.
pub async fn load_with_retry<T, F, Fut>(fetch: F, config: &RetryConfig) -> LoadResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let timeout_ms = config.timeout.as_millis() as u64;
    let mut last_error = LoadError::Fetch("no load attempts were made".to_string());

    for attempt in 0..config.retries {
        if attempt > 0 {
            let backoff = config.backoff_after(attempt - 1);
            debug!(attempt, backoff_ms = backoff.as_millis() as u64, "backing off before retry");
            tokio::time::sleep(backoff).await;
        }

        match tokio::time::timeout(config.timeout, fetch()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                warn!(attempt, error = %format!("{err:#}"), "fetch attempt failed");
                last_error = LoadError::from_fetch(err);
            }
            Err(_) => {
                warn!(attempt, timeout_ms, "fetch attempt timed out");
                last_error = LoadError::Timeout { timeout_ms };
            }
        }
    }

    Err(last_error)
}
