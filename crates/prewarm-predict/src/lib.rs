//! Speculative prefetching.
//!
//! Two cooperating pieces:
//! - [`PreloadScheduler`]: turns "warm this module" requests into delayed
//!   background fetches, de-duplicated against the cache and its own queue,
//!   with delays derived from priority and the environment reading.
//! - [`RoutePredictor`]: tracks route visits and, from a static transition
//!   table, decides *which* modules are worth warming when a route is
//!   entered.
//!
//! ```text
//! Route enter ──> RoutePredictor ──> predictions (key, priority)
//!                                         │
//!                                         ▼
//! Environment ──────────────> PreloadScheduler ──> delayed get_or_load
//!                                         │            (fire-and-forget)
//!                                         ▼
//!                                  ModuleCache
//! ```

mod routes;
mod scheduler;

pub use routes::{
    priority_for_probability, Prediction, RoutePredictor, Transition, TransitionTable,
    MIN_PRELOAD_PROBABILITY,
};
pub use scheduler::{PreloadScheduler, SchedulerConfig};
