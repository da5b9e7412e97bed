//! Module registration.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use prewarm_cache::FetchFn;
use prewarm_types::{ModuleKey, PriorityTier};

/// Predicate consulted before a module is preloaded speculatively.
pub type PreloadCondition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Everything a consumer supplies for one lazy module: the async fetch
/// factory, a priority tier, and an optional preload condition.
pub struct ModuleRegistration<T> {
    pub fetch: FetchFn<T>,
    pub priority: PriorityTier,
    pub preload_when: Option<PreloadCondition>,
}

impl<T> Clone for ModuleRegistration<T> {
    fn clone(&self) -> Self {
        Self {
            fetch: self.fetch.clone(),
            priority: self.priority,
            preload_when: self.preload_when.clone(),
        }
    }
}

impl<T> ModuleRegistration<T> {
    /// Register an async fetch factory. The factory is called once per fetch
    /// attempt and must produce a fresh future each time.
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            fetch: Arc::new(move || fetch().boxed()),
            priority: PriorityTier::default(),
            preload_when: None,
        }
    }

    pub fn with_priority(mut self, priority: PriorityTier) -> Self {
        self.priority = priority;
        self
    }

    /// Gate speculative preloads on a condition (e.g. a feature flag or a
    /// data-saver setting). On-demand loads ignore it.
    pub fn preload_when<P>(mut self, condition: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.preload_when = Some(Arc::new(condition));
        self
    }
}

/// Key -> registration table behind the runtime.
pub(crate) struct ModuleRegistry<T> {
    modules: Mutex<HashMap<ModuleKey, ModuleRegistration<T>>>,
}

impl<T> ModuleRegistry<T> {
    pub fn new() -> Self {
        Self {
            modules: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: impl Into<ModuleKey>, registration: ModuleRegistration<T>) {
        self.modules.lock().insert(key.into(), registration);
    }

    pub fn get(&self, key: &str) -> Option<ModuleRegistration<T>> {
        self.modules.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.modules.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.modules.lock().len()
    }
}
