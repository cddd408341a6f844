//! Incremental-sync state store (component G, spec §4.G). Backed by a
//! single JSON file `<output-dir>/.repodocs-state.json`, guarded by a
//! `tokio::sync::RwLock` and written atomically (temp file + rename), the
//! same idiom the pack uses for any on-disk state.

use chrono::Utc;
use repodocs_types::{PageState, RepodocsError, Result, SyncState, STATE_SCHEMA_VERSION};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::warn;

const STATE_FILE_NAME: &str = ".repodocs-state.json";

struct Inner {
    state: SyncState,
    dirty: bool,
}

/// The state store for one output directory. `disabled` short-circuits
/// `should_process` (always `true`) and `update`/`save` (no-ops), used for
/// `--full-sync` runs.
pub struct StateStore {
    path: PathBuf,
    inner: RwLock<Inner>,
    disabled: bool,
}

impl StateStore {
    /// Loads prior state from `<output_dir>/.repodocs-state.json`. A
    /// missing, corrupted, or version-mismatched file degrades to an empty
    /// state with a `tracing::warn!` — never a hard error, per spec §7.
    pub async fn load(output_dir: &Path, source_url: &str, strategy: &str, disabled: bool) -> Self {
        let path = output_dir.join(STATE_FILE_NAME);
        let state = Self::load_from_disk(&path, source_url, strategy)
            .await
            .unwrap_or_else(|reason| {
                warn!(path = %path.display(), %reason, "starting from empty sync state");
                SyncState::new(source_url, strategy)
            });

        Self {
            path,
            inner: RwLock::new(Inner {
                state,
                dirty: false,
            }),
            disabled,
        }
    }

    async fn load_from_disk(
        path: &Path,
        source_url: &str,
        strategy: &str,
    ) -> std::result::Result<SyncState, String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| "no prior sync state".to_string())?;
        let state: SyncState =
            serde_json::from_slice(&bytes).map_err(|e| format!("state file corrupted: {e}"))?;
        if state.version != STATE_SCHEMA_VERSION {
            return Err(format!(
                "state schema version mismatch: found {}, expected {}",
                state.version, STATE_SCHEMA_VERSION
            ));
        }
        if state.source_url != source_url || state.strategy != strategy {
            return Ok(SyncState::new(source_url, strategy));
        }
        Ok(state)
    }

    /// True if `url` is unknown to the prior sync, or its stored content
    /// hash differs from `content_hash`.
    pub async fn should_process(&self, url: &str, content_hash: &str) -> bool {
        if self.disabled {
            return true;
        }
        let inner = self.inner.read().await;
        match inner.state.pages.get(url) {
            Some(page) => page.content_hash != content_hash,
            None => true,
        }
    }

    /// Records (or overwrites) the page state for `url` and marks the
    /// store dirty. A no-op when disabled.
    pub async fn update(&self, url: &str, page: PageState) {
        if self.disabled {
            return;
        }
        let mut inner = self.inner.write().await;
        inner.state.pages.insert(url.to_string(), page);
        inner.dirty = true;
    }

    /// Atomically writes the state file if dirty. A no-op otherwise, and
    /// a no-op when disabled.
    pub async fn save(&self) -> Result<()> {
        if self.disabled {
            return Ok(());
        }
        let mut inner = self.inner.write().await;
        if !inner.dirty {
            return Ok(());
        }
        inner.state.last_sync = Utc::now();

        let json = serde_json::to_vec_pretty(&inner.state)
            .map_err(|e| RepodocsError::StateCorrupted(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        inner.dirty = false;
        Ok(())
    }

    /// Pages present in the prior sync but absent from `seen_urls`, for
    /// `--prune` support.
    pub async fn get_deleted(&self, seen_urls: &std::collections::HashSet<String>) -> Vec<(String, PageState)> {
        let inner = self.inner.read().await;
        inner
            .state
            .pages
            .iter()
            .filter(|(url, _)| !seen_urls.contains(*url))
            .map(|(url, page)| (url.clone(), page.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn page(hash: &str) -> PageState {
        PageState {
            content_hash: hash.to_string(),
            fetched_at: Utc::now(),
            file_path: "page.md".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_state_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path(), "https://example.com", "single", false).await;
        assert!(store.should_process("https://example.com/a", "abc").await);
    }

    #[tokio::test]
    async fn should_process_false_when_hash_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path(), "https://example.com", "single", false).await;
        store.update("https://example.com/a", page("abc")).await;
        assert!(!store.should_process("https://example.com/a", "abc").await);
        assert!(store.should_process("https://example.com/a", "xyz").await);
    }

    #[tokio::test]
    async fn save_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = StateStore::load(dir.path(), "https://example.com", "single", false).await;
            store.update("https://example.com/a", page("abc")).await;
            store.save().await.unwrap();
        }

        let reloaded = StateStore::load(dir.path(), "https://example.com", "single", false).await;
        assert!(!reloaded.should_process("https://example.com/a", "abc").await);
    }

    #[tokio::test]
    async fn disabled_mode_always_wants_processing() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path(), "https://example.com", "single", true).await;
        store.update("https://example.com/a", page("abc")).await;
        assert!(store.should_process("https://example.com/a", "abc").await);
        store.save().await.unwrap();
        assert!(!dir.path().join(".repodocs-state.json").exists());
    }

    #[tokio::test]
    async fn get_deleted_returns_unseen_pages() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path(), "https://example.com", "single", false).await;
        store.update("https://example.com/a", page("abc")).await;
        store.update("https://example.com/b", page("def")).await;

        let mut seen = HashSet::new();
        seen.insert("https://example.com/a".to_string());

        let deleted = store.get_deleted(&seen).await;
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].0, "https://example.com/b");
    }

    #[tokio::test]
    async fn corrupted_state_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(".repodocs-state.json"), b"not json")
            .await
            .unwrap();
        let store = StateStore::load(dir.path(), "https://example.com", "single", false).await;
        assert!(store.should_process("https://example.com/a", "abc").await);
    }
}
