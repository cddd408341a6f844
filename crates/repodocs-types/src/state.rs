use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current schema version written by the Writer/State Store. Bumped whenever
/// the on-disk shape of [`SyncState`] changes incompatibly.
pub const STATE_SCHEMA_VERSION: i64 = 1;

/// Per-URL record inside [`SyncState::pages`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageState {
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
    pub file_path: String,
}

/// On-disk incremental-sync record for one output directory.
///
/// Persisted as `<output-dir>/.repodocs-state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub version: i64,
    pub source_url: String,
    pub strategy: String,
    pub last_sync: DateTime<Utc>,
    pub pages: BTreeMap<String, PageState>,
}

impl SyncState {
    pub fn new(source_url: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            version: STATE_SCHEMA_VERSION,
            source_url: source_url.into(),
            strategy: strategy.into(),
            last_sync: Utc::now(),
            pages: BTreeMap::new(),
        }
    }
}
