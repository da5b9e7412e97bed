//! Viewport-triggered asset loading.
//!
//! Defers fetching a displayable asset until its placeholder enters (or is
//! about to enter) the visible viewport. Urgent priority tiers skip the
//! visibility check entirely: for them latency matters more than bandwidth.
//! Rendering a placeholder versus the final asset stays with the consumer;
//! this crate only decides *when* to fetch and tracks a local loaded flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prewarm_cache::{FetchFn, ModuleCache};
use prewarm_types::{LoadResult, ModuleKey, PriorityTier};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Axis-aligned region in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the rect outward by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Anticipatory margin for a priority tier, in logical pixels.
///
/// `None` means the tier skips visibility detection entirely. Lower priority
/// gets a *smaller* margin: with less urgency there is no need to front-run
/// scrolling, so the fetch waits until the asset is closer to actually
/// visible.
pub fn visibility_margin(priority: PriorityTier) -> Option<f64> {
    match priority {
        PriorityTier::Critical | PriorityTier::High => None,
        PriorityTier::Medium => Some(200.0),
        PriorityTier::Low => Some(50.0),
    }
}

/// Whether an asset at `placeholder` should be fetched given the current
/// `viewport`.
pub fn should_load(priority: PriorityTier, placeholder: &Rect, viewport: &Rect) -> bool {
    match visibility_margin(priority) {
        None => true,
        Some(margin) => viewport.expand(margin).intersects(placeholder),
    }
}

/// Defers fetching one asset until its placeholder is (about to be) visible.
///
/// Feed it placeholder/viewport geometry from scroll or layout events via
/// [`observe`](ViewportLoader::observe); the first observation that passes
/// the visibility gate runs the fetch through the shared cache and flips the
/// loaded flag.
pub struct ViewportLoader<T> {
    key: ModuleKey,
    priority: PriorityTier,
    cache: ModuleCache<T>,
    fetch: FetchFn<T>,
    loaded: AtomicBool,
}

impl<T: Send + Sync + 'static> ViewportLoader<T> {
    pub fn new(
        key: impl Into<ModuleKey>,
        priority: PriorityTier,
        cache: ModuleCache<T>,
        fetch: FetchFn<T>,
    ) -> Self {
        Self {
            key: key.into(),
            priority,
            cache,
            fetch,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn priority(&self) -> PriorityTier {
        self.priority
    }

    /// Whether a fetch for this asset has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Report the current placeholder and viewport geometry.
    ///
    /// Returns `None` while the visibility gate is closed. Once it opens the
    /// asset is fetched through the cache (deduplicated and free on repeat
    /// observations) and the result handed back.
    pub async fn observe(
        &self,
        placeholder: Rect,
        viewport: Rect,
    ) -> Option<LoadResult<Arc<T>>> {
        if !should_load(self.priority, &placeholder, &viewport) {
            return None;
        }
        let fetch = self.fetch.clone();
        let result = self.cache.get_or_load(&self.key, move || (*fetch)()).await;
        if result.is_ok() && !self.loaded.swap(true, Ordering::AcqRel) {
            debug!(key = %self.key, "viewport asset loaded");
        }
        Some(result)
    }
}
