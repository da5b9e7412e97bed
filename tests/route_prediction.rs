//! Route-driven prediction and viewport gating, end to end through the
//! runtime facade.

mod common;

use common::{fast_runtime, settle, FetchCounter};
use prewarm::{
    EnvironmentReading, NetworkSpeed, PriorityTier, Rect, SchedulerConfig, Transition,
    TransitionTable,
};

fn navigation_table() -> TransitionTable {
    TransitionTable::new().with_route(
        "/",
        vec![
            Transition::new("/connect", 0.7),
            Transition::new("/about", 0.2),
        ],
    )
}

#[tokio::test(start_paused = true)]
async fn route_enter_warms_probable_modules_only() {
    let runtime = fast_runtime().transitions(navigation_table()).build();
    let mail = FetchCounter::new();
    let about = FetchCounter::new();
    runtime.register_module("mail", mail.registration("mail-bundle"));
    runtime.register_module("about-page", about.registration("about-page"));
    runtime.register_route("/connect", "mail");
    runtime.register_route("/about", "about-page");

    let queued = runtime.on_route_enter("/");
    assert_eq!(queued, 1);
    assert_eq!(runtime.visit_count("/"), 1);

    settle().await;

    // 0.7 > 0.3: warmed; 0.2 <= 0.3: untouched
    assert_eq!(mail.count(), 1);
    assert_eq!(about.count(), 0);
    assert!(runtime.cache().contains("mail"));
    assert!(!runtime.cache().contains("about-page"));

    // the later on-demand request is free
    assert_eq!(*runtime.load("mail").await.unwrap(), "mail-bundle");
    assert_eq!(mail.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unregistered_routes_track_stats_only() {
    let runtime = fast_runtime().transitions(navigation_table()).build();

    // neither target route registered: nothing to warm
    assert_eq!(runtime.on_route_enter("/"), 0);
    assert_eq!(runtime.on_route_enter("/"), 0);
    assert_eq!(runtime.visit_count("/"), 2);

    // routes absent from the table are still counted
    assert_eq!(runtime.on_route_enter("/unmapped"), 0);
    assert_eq!(runtime.visit_count("/unmapped"), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_navigation_does_not_duplicate_preloads() {
    let runtime = fast_runtime().transitions(navigation_table()).build();
    let mail = FetchCounter::new();
    runtime.register_module("mail", mail.registration("mail-bundle"));
    runtime.register_route("/connect", "mail");

    assert_eq!(runtime.on_route_enter("/"), 1);
    // second navigation while the first preload is still queued
    assert_eq!(runtime.on_route_enter("/"), 0);

    settle().await;
    assert_eq!(mail.count(), 1);

    // cached now: further navigations schedule nothing
    assert_eq!(runtime.on_route_enter("/"), 0);
}

#[test]
fn preload_delay_grows_on_constrained_environments() {
    let config = SchedulerConfig::default();
    let fast = config.preload_delay(
        PriorityTier::Low,
        &EnvironmentReading::new(NetworkSpeed::Fast, false),
    );
    let slow = config.preload_delay(
        PriorityTier::Low,
        &EnvironmentReading::new(NetworkSpeed::Slow, true),
    );
    assert!(slow > fast);
}

#[tokio::test(start_paused = true)]
async fn viewport_loader_uses_registered_priority() {
    let runtime = fast_runtime().build();
    let counter = FetchCounter::new();
    runtime.register_module(
        "hero-image",
        counter.registration("hero-bytes").with_priority(PriorityTier::Low),
    );

    let loader = runtime.viewport_loader("hero-image").expect("registered");
    assert_eq!(loader.priority(), PriorityTier::Low);

    let viewport = Rect::new(0.0, 0.0, 1000.0, 800.0);

    // below the fold and outside low's 50px margin
    let offscreen = Rect::new(0.0, 1000.0, 400.0, 300.0);
    assert!(loader.observe(offscreen, viewport).await.is_none());
    assert_eq!(counter.count(), 0);

    // scrolled close enough
    let near = Rect::new(0.0, 820.0, 400.0, 300.0);
    let result = loader.observe(near, viewport).await.expect("gate open");
    assert_eq!(*result.unwrap(), "hero-bytes");
    assert!(loader.is_loaded());
    assert_eq!(counter.count(), 1);

    // the shared cache means the on-demand path is now free too
    assert_eq!(*runtime.load("hero-image").await.unwrap(), "hero-bytes");
    assert_eq!(counter.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn viewport_loader_for_unregistered_key_is_none() {
    let runtime = fast_runtime().build();
    assert!(runtime.viewport_loader("missing").is_none());
}
