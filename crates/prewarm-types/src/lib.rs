//! Shared vocabulary for the prewarm loader.
//!
//! This crate defines the types every other prewarm crate speaks:
//! module keys, priority tiers, the one-shot environment reading, and the
//! loader error taxonomy. It has no async machinery of its own.

pub mod env_utils;
pub mod environment;
pub mod error;
pub mod priority;

pub use environment::{EnvironmentReading, NetworkSpeed};
pub use error::{LoadError, LoadResult};
pub use priority::PriorityTier;

/// Stable identifier for a deferred, lazily loaded unit.
///
/// Unique across the cache; used as the dictionary key everywhere.
pub type ModuleKey = String;
