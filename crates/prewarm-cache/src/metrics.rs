//! Metrics and reporting for loader operations.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Loader operation metrics (thread-safe counters).
#[derive(Debug, Clone, Default)]
pub struct LoaderMetrics {
    /// Requests served straight from the in-memory cache
    memory_hits: Arc<AtomicU64>,
    /// Requests that joined an already in-flight load
    inflight_joins: Arc<AtomicU64>,
    /// Fetches actually started (cache and in-flight miss)
    fetches: Arc<AtomicU64>,
    /// Fetches that settled in failure after retries
    load_failures: Arc<AtomicU64>,
    /// Speculative loads scheduled for background execution
    preloads_scheduled: Arc<AtomicU64>,
    /// Speculative loads deferred to a manual trigger on constrained devices
    preloads_deferred: Arc<AtomicU64>,
    /// Speculative loads that completed successfully
    preloads_completed: Arc<AtomicU64>,
    /// Speculative loads that failed (logged, never surfaced)
    preloads_failed: Arc<AtomicU64>,
    /// Best-effort session store writes that failed
    session_write_failures: Arc<AtomicU64>,
}

impl LoaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inflight_join(&self) {
        self.inflight_joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_scheduled(&self) {
        self.preloads_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_deferred(&self) {
        self.preloads_deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_completed(&self) {
        self.preloads_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_failed(&self) {
        self.preloads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_write_failure(&self) {
        self.session_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            inflight_joins: self.inflight_joins.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            preloads_scheduled: self.preloads_scheduled.load(Ordering::Relaxed),
            preloads_deferred: self.preloads_deferred.load(Ordering::Relaxed),
            preloads_completed: self.preloads_completed.load(Ordering::Relaxed),
            preloads_failed: self.preloads_failed.load(Ordering::Relaxed),
            session_write_failures: self.session_write_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.memory_hits.store(0, Ordering::Relaxed);
        self.inflight_joins.store(0, Ordering::Relaxed);
        self.fetches.store(0, Ordering::Relaxed);
        self.load_failures.store(0, Ordering::Relaxed);
        self.preloads_scheduled.store(0, Ordering::Relaxed);
        self.preloads_deferred.store(0, Ordering::Relaxed);
        self.preloads_completed.store(0, Ordering::Relaxed);
        self.preloads_failed.store(0, Ordering::Relaxed);
        self.session_write_failures.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of metrics (for reporting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub memory_hits: u64,
    pub inflight_joins: u64,
    pub fetches: u64,
    pub load_failures: u64,
    pub preloads_scheduled: u64,
    pub preloads_deferred: u64,
    pub preloads_completed: u64,
    pub preloads_failed: u64,
    pub session_write_failures: u64,
}

impl MetricsSnapshot {
    /// Total lookups that went through the cache front door.
    pub fn total_lookups(&self) -> u64 {
        self.memory_hits + self.inflight_joins + self.fetches
    }

    /// Share of lookups answered without starting a fetch.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_lookups();
        if total == 0 {
            return 0.0;
        }
        (self.memory_hits + self.inflight_joins) as f64 / total as f64
    }

    /// Share of scheduled speculative loads that completed.
    pub fn preload_success_rate(&self) -> f64 {
        let settled = self.preloads_completed + self.preloads_failed;
        if settled == 0 {
            return 0.0;
        }
        self.preloads_completed as f64 / settled as f64
    }
}
