//! prewarm — predictive module loader and cache.
//!
//! Decides *when* to fetch a deferred unit of code, *how* to recover from a
//! failed or slow fetch, *where* to keep a loaded unit so repeat requests
//! are free, and *which* units to fetch before they are explicitly needed.
//!
//! ```text
//! Environment Probe ──────────────┐ (informs delay)
//!                                 ▼
//! Route Predictor ──────> Preload Scheduler ──┐ (speculative)
//!                                             ▼
//! On-demand load ────────────────────> Retrying Fetcher
//!                                             │
//!                                             ▼
//!                                  Deduplicator + Cache ──> consumer
//! ```
//!
//! The [`LoaderRuntime`] owns all shared state (cache table, in-flight map,
//! preload queue) explicitly — construct one per process, or one per test.
//!
//! # Example
//!
//! ```ignore
//! use prewarm::{LoaderRuntime, ModuleRegistration, PriorityTier, Transition, TransitionTable};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime: LoaderRuntime<Vec<u8>> = LoaderRuntime::builder()
//!         .transitions(
//!             TransitionTable::new()
//!                 .with_route("/", vec![Transition::new("/connect", 0.7)]),
//!         )
//!         .build();
//!
//!     runtime.register_module(
//!         "mail",
//!         ModuleRegistration::new(|| async { fetch_mail_bundle().await })
//!             .with_priority(PriorityTier::High),
//!     );
//!     runtime.register_route("/connect", "mail");
//!
//!     // navigation warms likely-next modules in the background
//!     runtime.on_route_enter("/");
//!
//!     // the on-demand path hits the warmed cache
//!     let payload = runtime.load("mail").await?;
//!     Ok(())
//! }
//! ```

mod registry;
mod runtime;

pub use registry::{ModuleRegistration, PreloadCondition};
pub use runtime::{LoaderRuntime, RuntimeBuilder};

// Re-export the vocabulary and component types consumers wire against.
pub use prewarm_cache::{
    CacheEntry, FetchFn, FsSessionStore, LoaderMetrics, MemorySessionStore, MetricsSnapshot,
    ModuleCache, SessionRecord, SessionStore,
};
pub use prewarm_fetch::{load_with_retry, RetryConfig};
pub use prewarm_predict::{
    priority_for_probability, Prediction, PreloadScheduler, RoutePredictor, SchedulerConfig,
    Transition, TransitionTable, MIN_PRELOAD_PROBABILITY,
};
pub use prewarm_types::{
    EnvironmentReading, LoadError, LoadResult, ModuleKey, NetworkSpeed, PriorityTier,
};
pub use prewarm_viewport::{should_load, visibility_margin, Rect, ViewportLoader};
