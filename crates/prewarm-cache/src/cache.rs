//! Deduplicating module cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use prewarm_fetch::{load_with_retry, RetryConfig};
use prewarm_types::{LoadError, LoadResult, ModuleKey};
use tracing::{debug, warn};

use crate::metrics::LoaderMetrics;
use crate::session::{SessionRecord, SessionStore};

/// Shared fetch factory. Each invocation must produce a fresh future; the
/// retry loop calls it once per attempt.
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// A successfully loaded module plus load metadata.
///
/// Immutable once written; overwritten only by a fresh successful load for
/// the same key. Entries live for the process lifetime unless the cache is
/// explicitly cleared.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub payload: Arc<T>,
    /// Wall-clock completion time, epoch milliseconds.
    pub loaded_at_epoch_ms: i64,
    /// How long the winning fetch took.
    pub load_duration_ms: u64,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            payload: self.payload.clone(),
            loaded_at_epoch_ms: self.loaded_at_epoch_ms,
            load_duration_ms: self.load_duration_ms,
        }
    }
}

type SharedLoad<T> = Shared<BoxFuture<'static, LoadResult<Arc<T>>>>;

struct CacheState<T> {
    entries: HashMap<ModuleKey, CacheEntry<T>>,
    inflight: HashMap<ModuleKey, SharedLoad<T>>,
    /// Bumped on every `clear`; a load settling under an older generation
    /// may not write into the fresh one.
    generation: u64,
}

/// Process-lifetime module cache with in-flight deduplication.
///
/// One mutex guards both maps, so the check-then-insert on the in-flight
/// table — the linchpin of the at-most-one-fetch invariant — is a single
/// critical section. Cloning yields another handle onto the same state.
pub struct ModuleCache<T> {
    state: Arc<Mutex<CacheState<T>>>,
    retry: RetryConfig,
    session: Option<Arc<dyn SessionStore>>,
    metrics: LoaderMetrics,
}

impl<T> Clone for ModuleCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            retry: self.retry.clone(),
            session: self.session.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T> ModuleCache<T> {
    /// Create a cache with no session mirroring.
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                inflight: HashMap::new(),
                generation: 0,
            })),
            retry,
            session: None,
            metrics: LoaderMetrics::new(),
        }
    }

    /// Create a cache that mirrors load telemetry into `store` after each
    /// successful load.
    pub fn with_session_store(retry: RetryConfig, store: Arc<dyn SessionStore>) -> Self {
        let mut cache = Self::new(retry);
        cache.session = Some(store);
        cache
    }

    /// Whether `key` has a cached payload (in-flight loads do not count).
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Whether a fetch for `key` is currently outstanding.
    pub fn is_inflight(&self, key: &str) -> bool {
        self.state.lock().inflight.contains_key(key)
    }

    /// Clone of the cache entry for `key`, payload and metadata.
    pub fn entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.state.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn inflight_count(&self) -> usize {
        self.state.lock().inflight.len()
    }

    pub fn metrics(&self) -> &LoaderMetrics {
        &self.metrics
    }

    /// Advisory warm-start hint from the session store, if one is attached
    /// and has a record for `key`. Never consulted by the load path.
    pub fn warm_hint(&self, key: &str) -> Option<SessionRecord> {
        let store = self.session.as_ref()?;
        match store.get(key) {
            Ok(record) => record,
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "session store read failed");
                None
            }
        }
    }

    /// Drop every cache entry and in-flight handle in one critical section.
    ///
    /// Loads already running keep executing, but the generation bump stops
    /// them from writing into the emptied cache; the next `get_or_load` for
    /// any key starts from scratch.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.inflight.clear();
        state.generation += 1;
    }
}

impl<T: Send + Sync + 'static> ModuleCache<T> {
    /// Return the cached payload for `key`, joining the in-flight load if
    /// one is outstanding, otherwise starting a retried fetch.
    ///
    /// Every concurrent caller for the same key awaits the same shared
    /// future and observes the same outcome. On success the payload is
    /// cached and its telemetry mirrored (best-effort) into the session
    /// store; on failure nothing is cached, so a later call retries from
    /// scratch.
    pub async fn get_or_load<F, Fut>(&self, key: &str, fetch: F) -> LoadResult<Arc<T>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let shared = {
            let mut state = self.state.lock();
            if let Some(entry) = state.entries.get(key) {
                self.metrics.record_memory_hit();
                debug!(key, "cache hit");
                return Ok(entry.payload.clone());
            }
            if let Some(existing) = state.inflight.get(key) {
                self.metrics.record_inflight_join();
                debug!(key, "joining in-flight load");
                existing.clone()
            } else {
                self.metrics.record_fetch();
                let load = self.start_load(key.to_string(), state.generation, fetch);
                state.inflight.insert(key.to_string(), load.clone());
                load
            }
        };
        shared.await
    }

    fn start_load<F, Fut>(&self, key: ModuleKey, generation: u64, fetch: F) -> SharedLoad<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let retry = self.retry.clone();
        let session = self.session.clone();
        let metrics = self.metrics.clone();

        async move {
            let started = Instant::now();
            let result = load_with_retry(fetch, &retry).await;
            let settled = settle(
                &state,
                &key,
                generation,
                started.elapsed().as_millis() as u64,
                result,
            );
            match settled {
                Ok((payload, record)) => {
                    if let Some(store) = &session {
                        if let Err(err) = store.put(&key, &record) {
                            metrics.record_session_write_failure();
                            warn!(key = %key, error = %format!("{err:#}"), "session store write failed");
                        }
                    }
                    Ok(payload)
                }
                Err(err) => {
                    metrics.record_load_failure();
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Remove the in-flight handle and, on success, write the cache entry.
/// Writes are skipped when the cache was cleared mid-load (stale
/// generation) so a cleared cache stays cleared.
fn settle<T>(
    state: &Mutex<CacheState<T>>,
    key: &str,
    generation: u64,
    load_duration_ms: u64,
    result: LoadResult<T>,
) -> Result<(Arc<T>, SessionRecord), LoadError> {
    let mut state = state.lock();
    let current = state.generation == generation;
    if current {
        state.inflight.remove(key);
    }
    match result {
        Ok(payload) => {
            let payload = Arc::new(payload);
            let record = SessionRecord {
                loaded_at_epoch_ms: Utc::now().timestamp_millis(),
                load_duration_ms,
            };
            if current {
                state.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        payload: payload.clone(),
                        loaded_at_epoch_ms: record.loaded_at_epoch_ms,
                        load_duration_ms,
                    },
                );
            }
            Ok((payload, record))
        }
        Err(err) => Err(err),
    }
}
