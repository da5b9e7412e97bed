//! Error types for module loading.

use thiserror::Error;

/// Result type for loader operations.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Errors that can settle a module load.
///
/// The enum is `Clone` on purpose: concurrent callers de-duplicated onto one
/// in-flight load all receive the same settled outcome, so the error must be
/// shareable. Messages are carried as strings rather than error sources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The attempt lost its race against the timeout timer. The underlying
    /// fetch is abandoned, not cancelled.
    #[error("load attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The caller-supplied fetch failed.
    #[error("module fetch failed: {0}")]
    Fetch(String),
}

impl LoadError {
    /// Convert a caller fetch error, flattening the anyhow chain into the
    /// message so the cause survives cloning.
    pub fn from_fetch(err: anyhow::Error) -> Self {
        LoadError::Fetch(format!("{err:#}"))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LoadError::Timeout { .. })
    }
}
