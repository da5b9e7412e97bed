//! Load deduplication and caching.
//!
//! This crate owns the process-lifetime module cache and the in-flight map
//! that guarantees **at most one outstanding fetch per key**. Concurrent
//! callers requesting the same key join the same shared load future and
//! observe the same eventual outcome; successful payloads are cached with
//! timing metadata and optionally mirrored into a best-effort session store.

mod cache;
mod metrics;
mod session;

pub use cache::{CacheEntry, FetchFn, ModuleCache};
pub use metrics::{LoaderMetrics, MetricsSnapshot};
pub use session::{FsSessionStore, MemorySessionStore, SessionRecord, SessionStore};
