//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prewarm::{
    EnvironmentReading, LoaderRuntime, ModuleRegistration, NetworkSpeed, RetryConfig,
    RuntimeBuilder,
};

/// Counts invocations of a module's fetch function.
#[derive(Clone, Default)]
pub struct FetchCounter {
    calls: Arc<AtomicU32>,
}

impl FetchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// A registration whose fetch resolves to `payload` and counts calls.
    pub fn registration(&self, payload: &'static str) -> ModuleRegistration<&'static str> {
        let calls = self.calls.clone();
        ModuleRegistration::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(payload)
            }
        })
    }

    /// Like [`registration`](Self::registration), but the fetch sleeps for
    /// `delay` first so concurrent callers can pile up behind it.
    pub fn slow_registration(
        &self,
        payload: &'static str,
        delay: Duration,
    ) -> ModuleRegistration<&'static str> {
        let calls = self.calls.clone();
        ModuleRegistration::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
        })
    }

    /// A registration whose fetch always fails and counts calls.
    pub fn failing_registration(&self) -> ModuleRegistration<&'static str> {
        let calls = self.calls.clone();
        ModuleRegistration::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<&'static str, _>(anyhow::anyhow!("backend unavailable"))
            }
        })
    }
}

/// Deterministic retry policy for paused-clock tests.
pub fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_timeout(Duration::from_millis(100))
        .with_base_backoff(Duration::from_millis(10))
        .without_jitter()
}

/// Runtime builder pinned to a fast, capable environment so preload delays
/// stay short and nothing is deferred.
pub fn fast_runtime() -> RuntimeBuilder<&'static str> {
    LoaderRuntime::builder()
        .environment(EnvironmentReading::new(NetworkSpeed::Fast, false))
        .retry(fast_retry())
}

/// Sleep past every scheduled preload delay and drain spawned tasks.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(60)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
