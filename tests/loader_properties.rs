//! Core loader properties: deduplication, caching, failure surfacing, and
//! the clear operation, exercised through the public runtime facade.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_runtime, settle, FetchCounter};
use prewarm::{
    EnvironmentReading, FsSessionStore, LoadError, MemorySessionStore, NetworkSpeed,
    PriorityTier, SessionStore,
};

#[tokio::test(start_paused = true)]
async fn concurrent_loads_share_one_fetch() {
    let runtime = fast_runtime().build();
    let counter = FetchCounter::new();

    // a fetch slow enough that all callers pile up behind it
    runtime.register_module(
        "mail",
        counter.slow_registration("mail-bundle", Duration::from_millis(50)),
    );

    let (a, b, c) = tokio::join!(
        runtime.load("mail"),
        runtime.load("mail"),
        runtime.load("mail")
    );

    assert_eq!(*a.unwrap(), "mail-bundle");
    assert_eq!(*b.unwrap(), "mail-bundle");
    assert_eq!(*c.unwrap(), "mail-bundle");
    assert_eq!(counter.count(), 1);

    let metrics = runtime.metrics();
    assert_eq!(metrics.fetches, 1);
    assert_eq!(metrics.inflight_joins, 2);
}

#[tokio::test(start_paused = true)]
async fn repeat_loads_hit_the_cache() {
    let runtime = fast_runtime().build();
    let counter = FetchCounter::new();
    runtime.register_module("settings", counter.registration("settings-panel"));

    for _ in 0..5 {
        let payload = runtime.load("settings").await.unwrap();
        assert_eq!(*payload, "settings-panel");
    }

    assert_eq!(counter.count(), 1);
    assert_eq!(runtime.metrics().memory_hits, 4);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_failure() {
    let runtime = fast_runtime().build();
    let counter = FetchCounter::new();
    runtime.register_module("flaky", counter.failing_registration());

    let result = runtime.load("flaky").await;
    match result {
        Err(LoadError::Fetch(msg)) => assert!(msg.contains("backend unavailable")),
        other => panic!("expected fetch error, got {other:?}"),
    }
    // default retry policy: three attempts
    assert_eq!(counter.count(), 3);

    // no negative caching: the next call starts a fresh fetch
    let _ = runtime.load("flaky").await;
    assert_eq!(counter.count(), 6);
}

#[tokio::test(start_paused = true)]
async fn unregistered_key_is_an_error() {
    let runtime = fast_runtime().build();
    let result = runtime.load("ghost").await;
    assert!(matches!(result, Err(LoadError::Fetch(msg)) if msg.contains("ghost")));
}

#[tokio::test(start_paused = true)]
async fn preload_is_idempotent() {
    let runtime = fast_runtime().build();
    let counter = FetchCounter::new();
    runtime.register_module(
        "mail",
        counter.registration("mail-bundle").with_priority(PriorityTier::Low),
    );

    assert!(runtime.preload("mail"));
    assert!(!runtime.preload("mail"));

    settle().await;
    assert_eq!(counter.count(), 1);
    assert!(runtime.cache().contains("mail"));

    // already cached now: further preloads are no-ops
    assert!(!runtime.preload("mail"));
}

#[tokio::test(start_paused = true)]
async fn preload_condition_gates_speculation() {
    let runtime = fast_runtime().build();
    let counter = FetchCounter::new();
    runtime.register_module(
        "heavy-chart",
        counter
            .registration("chart")
            .preload_when(|| false),
    );

    assert!(!runtime.preload("heavy-chart"));
    settle().await;
    assert_eq!(counter.count(), 0);

    // the condition only gates speculation; on-demand loads ignore it
    assert_eq!(*runtime.load("heavy-chart").await.unwrap(), "chart");
}

#[tokio::test(start_paused = true)]
async fn clear_empties_cache_inflight_and_queue() {
    let runtime = fast_runtime().build();
    let a = FetchCounter::new();
    let b = FetchCounter::new();
    let c = FetchCounter::new();
    runtime.register_module("a", a.registration("payload-a"));
    runtime.register_module("b", b.registration("payload-b"));
    runtime.register_module(
        "c",
        c.registration("payload-c").with_priority(PriorityTier::Low),
    );

    runtime.load("a").await.unwrap();
    runtime.load("b").await.unwrap();
    assert!(runtime.preload("c"));
    assert_eq!(runtime.cache().len(), 2);
    assert_eq!(runtime.queued_preloads(), 1);

    runtime.clear();

    assert!(runtime.cache().is_empty());
    assert_eq!(runtime.cache().inflight_count(), 0);
    assert_eq!(runtime.queued_preloads(), 0);

    // the pending preload for c was cancelled, never fetched
    settle().await;
    assert_eq!(c.count(), 0);

    // a cached key reloads from scratch after the clear
    runtime.load("a").await.unwrap();
    assert_eq!(a.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn constrained_device_defers_preloads() {
    let runtime = fast_runtime()
        .environment(EnvironmentReading::new(NetworkSpeed::Slow, true))
        .build();
    let counter = FetchCounter::new();
    runtime.register_module(
        "gallery",
        counter.registration("gallery").with_priority(PriorityTier::High),
    );

    assert!(runtime.preload("gallery"));
    settle().await;

    // nothing fetched unattended
    assert_eq!(counter.count(), 0);
    assert_eq!(runtime.deferred_keys(), vec!["gallery".to_string()]);

    // the manual affordance drives the load
    let result = runtime.load_now("gallery").await.expect("deferred entry");
    assert_eq!(*result.unwrap(), "gallery");
    assert_eq!(counter.count(), 1);
    assert!(runtime.deferred_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn session_records_are_mirrored_best_effort() {
    let store = Arc::new(MemorySessionStore::new());
    let runtime = fast_runtime().session_store(store.clone()).build();
    let counter = FetchCounter::new();
    runtime.register_module("mail", counter.registration("mail-bundle"));

    runtime.load("mail").await.unwrap();

    let record = store.get("mail").unwrap().expect("record mirrored");
    assert!(record.loaded_at_epoch_ms > 0);
    assert_eq!(runtime.cache().warm_hint("mail"), Some(record));
}

#[tokio::test(start_paused = true)]
async fn session_records_survive_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FsSessionStore::new(dir.path()).unwrap());
    let runtime = fast_runtime().session_store(store.clone()).build();
    let counter = FetchCounter::new();
    runtime.register_module("routes/settings", counter.registration("settings"));

    runtime.load("routes/settings").await.unwrap();

    let record = store
        .get("routes/settings")
        .unwrap()
        .expect("record mirrored to disk");
    assert!(record.loaded_at_epoch_ms > 0);

    // a second store over the same directory sees the record (warm-start hint)
    let reopened = FsSessionStore::new(dir.path()).unwrap();
    assert_eq!(reopened.get("routes/settings").unwrap(), Some(record));
}
