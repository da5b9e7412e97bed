//! LoaderRuntime - one owned object for all loader state.
//!
//! The cache table, in-flight map, and preload queue are process-wide
//! mutable state; holding them in a single runtime object (instead of
//! module-level globals) keeps the at-most-one-fetch invariant testable —
//! construct a fresh runtime per test and per process.

use std::marker::PhantomData;
use std::sync::Arc;

use prewarm_cache::{MetricsSnapshot, ModuleCache, SessionStore};
use prewarm_fetch::RetryConfig;
use prewarm_predict::{PreloadScheduler, RoutePredictor, SchedulerConfig, TransitionTable};
use prewarm_types::{EnvironmentReading, LoadError, LoadResult, ModuleKey, PriorityTier};
use prewarm_viewport::ViewportLoader;
use tracing::{debug, info};

use crate::registry::{ModuleRegistry, ModuleRegistration};

/// Facade over the loader subsystem: environment probe, retrying fetcher,
/// deduplicating cache, preload scheduler, and route predictor, wired
/// together behind the registration API.
pub struct LoaderRuntime<T> {
    environment: EnvironmentReading,
    cache: ModuleCache<T>,
    scheduler: PreloadScheduler<T>,
    predictor: RoutePredictor,
    registry: ModuleRegistry<T>,
}

impl<T: Send + Sync + 'static> LoaderRuntime<T> {
    /// Build a runtime with probed environment and default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder<T> {
        RuntimeBuilder::new()
    }

    // ==================== Registration ====================

    /// Register a lazy module under a stable key.
    pub fn register_module(&self, key: impl Into<ModuleKey>, registration: ModuleRegistration<T>) {
        let key = key.into();
        debug!(key = %key, priority = registration.priority.as_str(), "module registered");
        self.registry.insert(key, registration);
    }

    /// Bind a route to the module key that backs it. Prediction only acts on
    /// registered routes; others accumulate usage stats.
    pub fn register_route(&self, route: impl Into<String>, key: impl Into<ModuleKey>) {
        self.predictor.register_route(route, key);
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.registry.contains(key)
    }

    // ==================== Loading ====================

    /// On-demand load: cached payload, a join onto the in-flight fetch, or a
    /// fresh retried fetch. Failures after retries surface to the caller so
    /// the consumer can show an error state.
    pub async fn load(&self, key: &str) -> LoadResult<Arc<T>> {
        let registration = self
            .registry
            .get(key)
            .ok_or_else(|| LoadError::Fetch(format!("no module registered for key '{key}'")))?;
        let fetch = registration.fetch;
        self.cache.get_or_load(key, move || (*fetch)()).await
    }

    /// Speculatively warm a registered module at its registered priority.
    /// Returns whether a preload was actually queued: the registered preload
    /// condition, an existing cache entry, or a queued duplicate all turn
    /// this into a no-op.
    pub fn preload(&self, key: &str) -> bool {
        let Some(registration) = self.registry.get(key) else {
            debug!(key, "preload skipped: unregistered key");
            return false;
        };
        if let Some(condition) = &registration.preload_when {
            if !condition() {
                debug!(key, "preload skipped: condition is false");
                return false;
            }
        }
        self.scheduler
            .schedule(key, registration.fetch.clone(), registration.priority)
    }

    /// Record a navigation and warm the modules likely to be needed next.
    /// Returns how many preloads were queued.
    pub fn on_route_enter(&self, route: &str) -> usize {
        let visits = self.predictor.record_visit(route);
        debug!(route, visits, "route entered");

        let mut queued = 0;
        for prediction in self.predictor.predictions(route) {
            let Some(registration) = self.registry.get(&prediction.key) else {
                continue;
            };
            if let Some(condition) = &registration.preload_when {
                if !condition() {
                    continue;
                }
            }
            if self
                .scheduler
                .schedule(&prediction.key, registration.fetch.clone(), prediction.priority)
            {
                info!(
                    route,
                    key = %prediction.key,
                    probability = prediction.probability,
                    priority = prediction.priority.as_str(),
                    "route prediction warmed module"
                );
                queued += 1;
            }
        }
        queued
    }

    /// Manually trigger a preload that was deferred on a constrained device.
    pub async fn load_now(&self, key: &str) -> Option<LoadResult<Arc<T>>> {
        self.scheduler.load_now(key).await
    }

    /// Build a viewport-gated loader for a registered module.
    pub fn viewport_loader(&self, key: &str) -> Option<ViewportLoader<T>> {
        let registration = self.registry.get(key)?;
        Some(ViewportLoader::new(
            key,
            registration.priority,
            self.cache.clone(),
            registration.fetch,
        ))
    }

    // ==================== State & teardown ====================

    /// Empty the cache, the in-flight map, and the preload queue. Sleeping
    /// preload tasks abort on wake; loads already in flight cannot write
    /// into the cleared cache. The next `load` for any key fetches from
    /// scratch.
    pub fn clear(&self) {
        self.scheduler.clear_queue();
        self.cache.clear();
        info!("loader runtime cleared");
    }
}

impl<T> LoaderRuntime<T> {
    /// The environment reading probed (or injected) at construction.
    pub fn environment(&self) -> &EnvironmentReading {
        &self.environment
    }

    /// Shared handle onto the module cache.
    pub fn cache(&self) -> &ModuleCache<T> {
        &self.cache
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.cache.metrics().snapshot()
    }

    /// Preload keys waiting for a manual trigger on constrained devices.
    pub fn deferred_keys(&self) -> Vec<ModuleKey> {
        self.scheduler.deferred_keys()
    }

    /// Number of keys currently in the preload queue (scheduled or deferred).
    pub fn queued_preloads(&self) -> usize {
        self.scheduler.queued_count()
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    pub fn visit_count(&self, route: &str) -> u64 {
        self.predictor.visit_count(route)
    }
}

impl<T: Send + Sync + 'static> Default for LoaderRuntime<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`LoaderRuntime`]. Every knob has a sensible default: probed
/// environment, standard retry policy, default scheduler delays, empty
/// transition table, no session store.
pub struct RuntimeBuilder<T> {
    environment: Option<EnvironmentReading>,
    retry: RetryConfig,
    scheduler: SchedulerConfig,
    transitions: TransitionTable,
    session_store: Option<Arc<dyn SessionStore>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> RuntimeBuilder<T> {
    pub fn new() -> Self {
        Self {
            environment: None,
            retry: RetryConfig::default(),
            scheduler: SchedulerConfig::default(),
            transitions: TransitionTable::new(),
            session_store: None,
            _payload: PhantomData,
        }
    }

    /// Inject a fixed environment reading instead of probing.
    pub fn environment(mut self, environment: EnvironmentReading) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn scheduler_config(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = transitions;
        self
    }

    /// Attach a best-effort session store for load telemetry.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn build(self) -> LoaderRuntime<T> {
        let environment = self.environment.unwrap_or_else(EnvironmentReading::detect);
        let cache = match self.session_store {
            Some(store) => ModuleCache::with_session_store(self.retry, store),
            None => ModuleCache::new(self.retry),
        };
        let scheduler =
            PreloadScheduler::with_config(cache.clone(), environment, self.scheduler);
        info!(
            network = environment.network_speed.as_str(),
            low_end = environment.is_low_end_device,
            "loader runtime constructed"
        );
        LoaderRuntime {
            environment,
            cache,
            scheduler,
            predictor: RoutePredictor::new(self.transitions),
            registry: ModuleRegistry::new(),
        }
    }
}

impl<T: Send + Sync + 'static> Default for RuntimeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
