//! Content-addressed response cache (component C, spec §4.C).
//!
//! Scoped to the in-memory case: no Redis-backed distributed tier, no
//! idempotency-store persistence. Keyed by the caller's already-normalized
//! URL string, so `repodocs-spider`'s visited set and this cache agree on
//! key space.

use dashmap::DashMap;
use repodocs_types::FetchResponse;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: FetchResponse,
    inserted_at: Instant,
}

/// Construction-time configuration for a [`Cache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Thread-safe content-addressed cache. Concurrent `lookup`/`store` on the
/// same key are permitted; the last `store` wins.
pub struct Cache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    /// `--refresh-cache`: force misses without discarding existing entries.
    refresh: bool,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.ttl,
            refresh: false,
        }
    }

    /// Builds a cache that always reports misses on lookup but still
    /// records stores, used for `--refresh-cache` runs.
    pub fn with_refresh(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.ttl,
            refresh: true,
        }
    }

    /// Returns `(response, hit)`. An entry older than the configured TTL
    /// is reported as a miss but left in the map for `store` to overwrite.
    pub fn lookup(&self, url: &str) -> Option<(FetchResponse, bool)> {
        if self.refresh {
            return None;
        }
        let entry = self.entries.get(url)?;
        if entry.inserted_at.elapsed() > self.ttl {
            trace!(url, "cache entry expired");
            return None;
        }
        Some((entry.response.clone(), true))
    }

    pub fn store(&self, url: &str, response: FetchResponse) {
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                response,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops expired entries. Opportunistic; never called on the hot path.
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
