//! Bounded, concurrent, politeness-delayed traversal (component K, spec
//! §4.K). Grounded on `riptide-core/src/spider/core.rs`'s `Spider` engine
//! — `Arc`-shared state, per-worker loops, `tracing::instrument` spans —
//! scaled down to a single FIFO frontier instead of the teacher's
//! per-host scheduling and adaptive-stop machinery, since this crate has
//! no use for multi-domain crawling.

use crate::filters::{self, FilterConfig};
use crate::normalize;
use rand::Rng;
use repodocs_cache::Cache;
use repodocs_fetch::Fetcher;
use repodocs_render::Renderer;
use repodocs_state::StateStore;
use repodocs_types::{FetchResponse, PageState, RepodocsError, Result};
use repodocs_writer::Writer;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Dependency bundle borrowed for the duration of one crawl invocation.
pub struct CrawlDeps {
    pub fetcher: Arc<dyn Fetcher>,
    pub renderer: Arc<dyn Renderer>,
    pub cache: Arc<Cache>,
    pub writer: Arc<Writer>,
    pub state: Arc<StateStore>,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_depth: u32,
    pub worker_count: usize,
    pub politeness_delay: (Duration, Duration),
    pub filters: FilterConfig,
    pub limit: Option<usize>,
    pub force_render: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            worker_count: 4,
            politeness_delay: (Duration::ZERO, Duration::ZERO),
            filters: FilterConfig::default(),
            limit: None,
            force_render: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct CrawlResult {
    pub documents_written: usize,
    pub seen_urls: HashSet<String>,
    pub errors: Vec<String>,
}

struct Frontier {
    queue: Mutex<VecDeque<(String, u32)>>,
    visited: dashmap::DashMap<String, ()>,
    in_flight: AtomicUsize,
    written: AtomicUsize,
    notify: Notify,
}

/// Runs the crawl to completion (frontier drained, `limit` reached, or
/// cancellation observed).
#[instrument(skip(deps, cancel), fields(seed = %seed))]
pub async fn crawl(
    seed: &str,
    config: CrawlConfig,
    deps: CrawlDeps,
    cancel: CancellationToken,
) -> Result<CrawlResult> {
    let Some(normalized_seed) = normalize::normalize(seed) else {
        return Err(RepodocsError::UnsupportedLocator(seed.to_string()));
    };
    let seed_host = url::Url::parse(&normalized_seed)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default();

    let frontier = Arc::new(Frontier {
        queue: Mutex::new(VecDeque::from([(normalized_seed.clone(), 0)])),
        visited: dashmap::DashMap::new(),
        in_flight: AtomicUsize::new(0),
        written: AtomicUsize::new(0),
        notify: Notify::new(),
    });
    frontier.visited.insert(normalized_seed, ());

    let deps = Arc::new(deps);
    let config = Arc::new(config);
    let errors = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::with_capacity(config.worker_count);
    for _ in 0..config.worker_count {
        let frontier = frontier.clone();
        let deps = deps.clone();
        let config = config.clone();
        let cancel = cancel.clone();
        let seed_host = seed_host.clone();
        let errors = errors.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(frontier, deps, config, cancel, seed_host, errors).await;
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    if cancel.is_cancelled() {
        return Err(RepodocsError::Cancelled);
    }

    Ok(CrawlResult {
        documents_written: frontier.written.load(Ordering::SeqCst),
        seen_urls: frontier.visited.iter().map(|e| e.key().clone()).collect(),
        errors: Arc::try_unwrap(errors).map(Mutex::into_inner).unwrap_or_default(),
    })
}

async fn worker_loop(
    frontier: Arc<Frontier>,
    deps: Arc<CrawlDeps>,
    config: Arc<CrawlConfig>,
    cancel: CancellationToken,
    seed_host: String,
    errors: Arc<Mutex<Vec<String>>>,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        if let Some(limit) = config.limit {
            if frontier.written.load(Ordering::SeqCst) >= limit {
                return;
            }
        }

        let item = {
            let mut queue = frontier.queue.lock().await;
            queue.pop_front()
        };

        let Some((url, depth)) = item else {
            if frontier.in_flight.load(Ordering::Relaxed) == 0 {
                return;
            }
            tokio::select! {
                _ = frontier.notify.notified() => continue,
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_millis(25)) => continue,
            }
        };

        frontier.in_flight.fetch_add(1, Ordering::Relaxed);
        let outcome = process_one(&url, depth, &frontier, &deps, &config, &seed_host, &cancel).await;
        frontier.in_flight.fetch_sub(1, Ordering::Relaxed);
        frontier.notify.notify_waiters();

        if let Err(e) = outcome {
            warn!(url = %url, error = %e, "crawl item failed");
            errors.lock().await.push(format!("{url}: {e}"));
        }
    }
}

async fn process_one(
    url: &str,
    depth: u32,
    frontier: &Frontier,
    deps: &CrawlDeps,
    config: &CrawlConfig,
    seed_host: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let (min, max) = config.politeness_delay;
    if max > Duration::ZERO {
        let millis = if max > min {
            rand::thread_rng().gen_range(min.as_millis()..=max.as_millis())
        } else {
            min.as_millis()
        };
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(millis as u64)) => {}
            _ = cancel.cancelled() => return Err(RepodocsError::Cancelled),
        }
    }

    let response = fetch_with_cache(url, deps, config.force_render).await?;

    let document =
        repodocs_pipeline::process(url, &response.body, &response.content_type, config.force_render, "crawler")?;

    let Some(document) = document else {
        debug!(url, content_type = %response.content_type, "unsupported content-type, skipping");
        return Ok(());
    };

    let should_process = deps.state.should_process(url, &document.content_hash).await;
    if should_process {
        if reserve_write_slot(&frontier.written, config.limit) {
            match deps.writer.write(&document).await {
                Ok(path) => {
                    deps.state
                        .update(
                            url,
                            PageState {
                                content_hash: document.content_hash.clone(),
                                fetched_at: document.fetched_at,
                                file_path: path,
                            },
                        )
                        .await;
                }
                Err(e) => {
                    frontier.written.fetch_sub(1, Ordering::SeqCst);
                    return Err(e);
                }
            }
        } else {
            debug!(url, "limit reached, skipping write but still traversing links");
        }
    } else {
        debug!(url, "unchanged, skipping write but still traversing links");
    }

    if depth < config.max_depth {
        let mut queue_additions = Vec::new();
        for link in &document.links {
            let Some(normalized) = normalize::normalize(link) else {
                continue;
            };
            if !filters::admits(&normalized, seed_host, &config.filters) {
                continue;
            }
            if frontier.visited.insert(normalized.clone(), ()).is_some() {
                continue;
            }
            queue_additions.push((normalized, depth + 1));
        }
        if !queue_additions.is_empty() {
            let mut queue = frontier.queue.lock().await;
            queue.extend(queue_additions);
            frontier.notify.notify_waiters();
        }
    }

    Ok(())
}

/// Atomically reserves one write slot against `limit`, so concurrent
/// workers can never together write more than `limit` documents — spec
/// §8 "limit = N halts the crawl after writing N documents". Returns
/// `false` (no slot available) without mutating the counter when the
/// limit has already been reached.
fn reserve_write_slot(written: &AtomicUsize, limit: Option<usize>) -> bool {
    let Some(limit) = limit else {
        written.fetch_add(1, Ordering::SeqCst);
        return true;
    };
    written
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |w| {
            if w < limit {
                Some(w + 1)
            } else {
                None
            }
        })
        .is_ok()
}

async fn fetch_with_cache(url: &str, deps: &CrawlDeps, force_render: bool) -> Result<FetchResponse> {
    if !force_render {
        if let Some((cached, _hit)) = deps.cache.lookup(url) {
            return Ok(cached);
        }
    }

    let response = if force_render {
        deps.renderer.render(url).await?
    } else {
        deps.fetcher.get(url).await?
    };

    deps.cache.store(url, response.clone());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use repodocs_cache::CacheConfig;
    use repodocs_writer::WriterOptions;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct StubFetcher {
        pages: StdMutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse> {
            let pages = self.pages.lock().unwrap();
            let body = pages
                .get(url)
                .cloned()
                .ok_or_else(|| RepodocsError::Http { status: 404 })?;
            Ok(FetchResponse {
                status: 200,
                body: body.into_bytes(),
                content_type: "text/html".to_string(),
                final_url: url.to_string(),
                headers: HashMap::new(),
            })
        }

        async fn head(&self, url: &str) -> Result<FetchResponse> {
            self.get(url).await
        }
    }

    /// Same shape as [`StubFetcher`], but pages carry an explicit
    /// content-type so tests can exercise the skip path.
    struct TypedStubFetcher {
        pages: StdMutex<HashMap<String, (String, String)>>,
    }

    #[async_trait]
    impl Fetcher for TypedStubFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse> {
            let pages = self.pages.lock().unwrap();
            let (body, content_type) = pages
                .get(url)
                .cloned()
                .ok_or_else(|| RepodocsError::Http { status: 404 })?;
            Ok(FetchResponse {
                status: 200,
                body: body.into_bytes(),
                content_type,
                final_url: url.to_string(),
                headers: HashMap::new(),
            })
        }

        async fn head(&self, url: &str) -> Result<FetchResponse> {
            self.get(url).await
        }
    }

    #[tokio::test]
    async fn crawls_linked_pages_within_same_host() {
        let dir = tempfile::tempdir().unwrap();
        let mut pages = HashMap::new();
        pages.insert(
            "https://example.com/".to_string(),
            "<h1>Home</h1><a href=\"/docs/page\">docs</a>".to_string(),
        );
        pages.insert(
            "https://example.com/docs/page".to_string(),
            "<h1>Docs Page</h1><p>content</p>".to_string(),
        );

        let deps = CrawlDeps {
            fetcher: Arc::new(StubFetcher {
                pages: StdMutex::new(pages),
            }),
            renderer: Arc::new(repodocs_render::DisabledRenderer),
            cache: Arc::new(Cache::new(CacheConfig::default())),
            writer: Arc::new(Writer::new(WriterOptions {
                output_dir: dir.path().to_path_buf(),
                ..WriterOptions::default()
            })),
            state: Arc::new(
                StateStore::load(dir.path(), "https://example.com/", "crawler", false).await,
            ),
        };

        let result = crawl(
            "https://example.com/",
            CrawlConfig {
                max_depth: 2,
                worker_count: 2,
                ..CrawlConfig::default()
            },
            deps,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.documents_written, 2);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn linked_image_is_fetched_but_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut pages = HashMap::new();
        pages.insert(
            "https://example.com/".to_string(),
            (
                "<h1>Home</h1><a href=\"/logo.png\">logo</a>".to_string(),
                "text/html".to_string(),
            ),
        );
        pages.insert(
            "https://example.com/logo.png".to_string(),
            ("\u{fffd}PNG".to_string(), "image/png".to_string()),
        );

        let deps = CrawlDeps {
            fetcher: Arc::new(TypedStubFetcher {
                pages: StdMutex::new(pages),
            }),
            renderer: Arc::new(repodocs_render::DisabledRenderer),
            cache: Arc::new(Cache::new(CacheConfig::default())),
            writer: Arc::new(Writer::new(WriterOptions {
                output_dir: dir.path().to_path_buf(),
                ..WriterOptions::default()
            })),
            state: Arc::new(StateStore::load(dir.path(), "https://example.com/", "crawler", false).await),
        };

        let result = crawl(
            "https://example.com/",
            CrawlConfig {
                max_depth: 2,
                worker_count: 2,
                ..CrawlConfig::default()
            },
            deps,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.documents_written, 1);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn limit_is_never_exceeded_by_concurrent_workers() {
        let dir = tempfile::tempdir().unwrap();
        let mut pages = HashMap::new();
        pages.insert(
            "https://example.com/".to_string(),
            "<h1>Home</h1><a href=\"/a\">a</a><a href=\"/b\">b</a><a href=\"/c\">c</a>".to_string(),
        );
        for name in ["a", "b", "c"] {
            pages.insert(
                format!("https://example.com/{name}"),
                format!("<h1>{name}</h1><p>content</p>"),
            );
        }

        let deps = CrawlDeps {
            fetcher: Arc::new(StubFetcher {
                pages: StdMutex::new(pages),
            }),
            renderer: Arc::new(repodocs_render::DisabledRenderer),
            cache: Arc::new(Cache::new(CacheConfig::default())),
            writer: Arc::new(Writer::new(WriterOptions {
                output_dir: dir.path().to_path_buf(),
                ..WriterOptions::default()
            })),
            state: Arc::new(StateStore::load(dir.path(), "https://example.com/", "crawler", false).await),
        };

        let result = crawl(
            "https://example.com/",
            CrawlConfig {
                max_depth: 2,
                worker_count: 4,
                limit: Some(2),
                ..CrawlConfig::default()
            },
            deps,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.documents_written, 2);
    }
}
