//! Session-scoped persistence for load telemetry.
//!
//! The cache mirrors `{loaded_at_epoch_ms, load_duration_ms}` records into a
//! session store after each successful load. The store is advisory: the read
//! path feeds warm-start hints only, never correctness, and every write
//! failure is caught and logged by the caller rather than surfaced. The
//! trait is a capability-checked seam — an absent store means the mirror
//! step is skipped entirely.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Telemetry record for one successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Wall-clock completion time, epoch milliseconds.
    pub loaded_at_epoch_ms: i64,
    /// How long the winning fetch took.
    pub load_duration_ms: u64,
}

/// Key-value store for per-module session records.
pub trait SessionStore: Send + Sync {
    /// Store the record for a module key, replacing any previous one.
    fn put(&self, key: &str, record: &SessionRecord) -> Result<()>;

    /// Fetch the record for a module key, if present.
    fn get(&self, key: &str) -> Result<Option<SessionRecord>>;
}

/// Filesystem-backed session store, one JSON file per module key.
pub struct FsSessionStore {
    root: PathBuf,
}

impl FsSessionStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| anyhow!("Failed to create session root {}: {}", root.display(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Map a module key onto a safe file stem. Anything outside
/// `[A-Za-z0-9._-]` becomes an underscore.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write a file atomically (write to .tmp, then rename).
fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)
        .map_err(|e| anyhow!("Failed to write temp file {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        anyhow!(
            "Failed to rename {} to {}: {}",
            tmp_path.display(),
            path.display(),
            e
        )
    })?;
    Ok(())
}

impl SessionStore for FsSessionStore {
    fn put(&self, key: &str, record: &SessionRecord) -> Result<()> {
        let json = serde_json::to_vec(record)?;
        atomic_write(&self.record_path(key), &json)
    }

    fn get(&self, key: &str) -> Result<Option<SessionRecord>> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read session record {}: {}", path.display(), e))?;
        let record = serde_json::from_str(&json)
            .map_err(|e| anyhow!("Failed to parse session record JSON: {}", e))?;
        Ok(Some(record))
    }
}

/// In-memory session store for tests and environments without a usable
/// filesystem.
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, key: &str, record: &SessionRecord) -> Result<()> {
        self.records.lock().insert(key.to_string(), *record);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<SessionRecord>> {
        Ok(self.records.lock().get(key).copied())
    }
}
