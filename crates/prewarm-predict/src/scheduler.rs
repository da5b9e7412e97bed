//! Delayed, de-duplicated speculative loading.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use prewarm_cache::{FetchFn, ModuleCache};
use prewarm_types::{EnvironmentReading, LoadResult, ModuleKey, NetworkSpeed, PriorityTier};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Scheduling policy: per-priority base delays and environment multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay before a critical preload fires. Default: 0
    pub critical_delay: Duration,
    /// Delay before a high-priority preload fires. Default: 100ms
    pub high_delay: Duration,
    /// Delay before a medium-priority preload fires. Default: 500ms
    pub medium_delay: Duration,
    /// Delay before a low-priority preload fires. Default: 2s
    pub low_delay: Duration,
    /// Delay multiplier on a medium network. Default: 2.0
    pub medium_network_multiplier: f64,
    /// Delay multiplier on a slow network. Default: 4.0
    pub slow_network_multiplier: f64,
    /// Extra delay multiplier on a low-end device. Default: 1.5
    pub low_end_multiplier: f64,
    /// On a slow network + low-end device, queue preloads as deferred and
    /// wait for a manual trigger instead of fetching unattended.
    /// Default: true
    pub defer_on_constrained: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            critical_delay: Duration::ZERO,
            high_delay: Duration::from_millis(100),
            medium_delay: Duration::from_millis(500),
            low_delay: Duration::from_secs(2),
            medium_network_multiplier: 2.0,
            slow_network_multiplier: 4.0,
            low_end_multiplier: 1.5,
            defer_on_constrained: true,
        }
    }
}

impl SchedulerConfig {
    fn base_delay(&self, priority: PriorityTier) -> Duration {
        match priority {
            PriorityTier::Critical => self.critical_delay,
            PriorityTier::High => self.high_delay,
            PriorityTier::Medium => self.medium_delay,
            PriorityTier::Low => self.low_delay,
        }
    }

    /// Delay before a speculative fetch fires: the priority's base delay,
    /// stretched as network quality degrades and on low-end devices.
    /// Slower environments trade immediacy for not competing with
    /// foreground traffic.
    pub fn preload_delay(&self, priority: PriorityTier, env: &EnvironmentReading) -> Duration {
        let network = match env.network_speed {
            NetworkSpeed::Fast => 1.0,
            NetworkSpeed::Medium => self.medium_network_multiplier,
            NetworkSpeed::Slow => self.slow_network_multiplier,
        };
        let device = if env.is_low_end_device {
            self.low_end_multiplier
        } else {
            1.0
        };
        self.base_delay(priority).mul_f64(network * device)
    }
}

enum QueueEntry<T> {
    /// A background task is sleeping toward this key's fetch.
    Scheduled,
    /// Constrained device: waiting for an explicit `load_now`.
    Deferred { fetch: FetchFn<T> },
}

/// Schedules speculative loads against a shared [`ModuleCache`].
///
/// A key enters the queue at most once until its speculative fetch settles
/// (or the queue is cleared), so redundant predictor calls are free. Results
/// of speculative fetches are discarded: the value lands in the cache for
/// any later on-demand caller, failures are logged and swallowed.
pub struct PreloadScheduler<T> {
    cache: ModuleCache<T>,
    environment: EnvironmentReading,
    config: SchedulerConfig,
    queue: Arc<Mutex<HashMap<ModuleKey, QueueEntry<T>>>>,
}

impl<T: Send + Sync + 'static> PreloadScheduler<T> {
    pub fn new(cache: ModuleCache<T>, environment: EnvironmentReading) -> Self {
        Self::with_config(cache, environment, SchedulerConfig::default())
    }

    pub fn with_config(
        cache: ModuleCache<T>,
        environment: EnvironmentReading,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            cache,
            environment,
            config,
            queue: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn environment(&self) -> &EnvironmentReading {
        &self.environment
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Queue `key` for speculative loading. Returns `false` without side
    /// effects when the key is already cached or already queued.
    pub fn schedule(&self, key: &str, fetch: FetchFn<T>, priority: PriorityTier) -> bool {
        if self.cache.contains(key) {
            debug!(key, "preload skipped: already cached");
            return false;
        }

        let delay = self.config.preload_delay(priority, &self.environment);
        {
            let mut queue = self.queue.lock();
            if queue.contains_key(key) {
                debug!(key, "preload skipped: already queued");
                return false;
            }
            if self.config.defer_on_constrained && self.environment.is_constrained() {
                queue.insert(key.to_string(), QueueEntry::Deferred { fetch });
                self.cache.metrics().record_preload_deferred();
                info!(key, "constrained device: preload deferred to manual trigger");
                return true;
            }
            queue.insert(key.to_string(), QueueEntry::Scheduled);
        }

        self.cache.metrics().record_preload_scheduled();
        info!(
            key,
            priority = priority.as_str(),
            delay_ms = delay.as_millis() as u64,
            "preload scheduled"
        );

        let cache = self.cache.clone();
        let queue = Arc::clone(&self.queue);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // the queue may have been cleared while we slept
            if !matches!(queue.lock().get(&key), Some(QueueEntry::Scheduled)) {
                debug!(key = %key, "preload cancelled before firing");
                return;
            }
            let result = cache.get_or_load(&key, move || (*fetch)()).await;
            queue.lock().remove(&key);
            match result {
                Ok(_) => {
                    cache.metrics().record_preload_completed();
                    debug!(key = %key, "preload completed");
                }
                Err(err) => {
                    cache.metrics().record_preload_failed();
                    warn!(key = %key, error = %err, "speculative load failed");
                }
            }
        });
        true
    }

    /// Manually trigger a deferred preload. Returns `None` when `key` has no
    /// deferred entry; this is the only await-able path the scheduler
    /// exposes, since the consumer asked for the load explicitly.
    pub async fn load_now(&self, key: &str) -> Option<LoadResult<Arc<T>>> {
        let fetch = {
            let queue = self.queue.lock();
            match queue.get(key) {
                Some(QueueEntry::Deferred { fetch }) => fetch.clone(),
                _ => return None,
            }
        };

        let result = self.cache.get_or_load(key, move || (*fetch)()).await;
        self.queue.lock().remove(key);
        match &result {
            Ok(_) => self.cache.metrics().record_preload_completed(),
            Err(err) => {
                self.cache.metrics().record_preload_failed();
                warn!(key, error = %err, "deferred load failed");
            }
        }
        Some(result)
    }
}

impl<T> PreloadScheduler<T> {
    /// Whether `key` currently sits in the preload queue.
    pub fn is_queued(&self, key: &str) -> bool {
        self.queue.lock().contains_key(key)
    }

    pub fn queued_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Keys waiting for a manual `load_now` trigger.
    pub fn deferred_keys(&self) -> Vec<ModuleKey> {
        self.queue
            .lock()
            .iter()
            .filter_map(|(key, entry)| match entry {
                QueueEntry::Deferred { .. } => Some(key.clone()),
                QueueEntry::Scheduled => None,
            })
            .collect()
    }

    /// Empty the queue. Sleeping preload tasks notice on wake and abort
    /// without fetching.
    pub fn clear_queue(&self) {
        self.queue.lock().clear();
    }
}
