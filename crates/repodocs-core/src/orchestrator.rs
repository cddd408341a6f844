//! The orchestrator (component M, spec §4.M): builds the dependency
//! bundle, routes a locator to a strategy, runs it, and flushes sync
//! state. Everything it touches — fetch, render, cache, write, classify —
//! is someone else's crate; this one just sequences them.

use crate::options::{ManifestOutcome, RunOptions, RunOutcome};
use crate::strategy::{DefaultStrategyFactory, StrategyDeps, StrategyFactory};
use repodocs_cache::Cache;
use repodocs_fetch::Fetcher;
use repodocs_render::Renderer;
use repodocs_types::{Manifest, RepodocsError, Result, StrategyKind};
use repodocs_writer::{Writer, WriterOptions};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Caps how many sources from a manifest run concurrently, regardless of
/// the manifest's own `concurrency` option — keeps a single misconfigured
/// batch from opening unbounded connections against the dependency bundle.
const MAX_MANIFEST_CONCURRENCY: usize = 3;

pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher>,
    renderer: Arc<dyn Renderer>,
    cache: Arc<Cache>,
    factory: Box<dyn StrategyFactory>,
}

impl Orchestrator {
    /// Constructs the orchestrator from an already-assembled dependency
    /// bundle. Fetcher, Renderer, and Cache are shared across every run;
    /// Writer and State Store are scoped per run and built inside
    /// [`Orchestrator::run`].
    pub fn new(fetcher: Arc<dyn Fetcher>, renderer: Arc<dyn Renderer>, cache: Arc<Cache>) -> Self {
        Self {
            fetcher,
            renderer,
            cache,
            factory: Box::new(DefaultStrategyFactory),
        }
    }

    /// Swaps in a test-provided [`StrategyFactory`].
    pub fn with_factory(mut self, factory: Box<dyn StrategyFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Validates a locator without running anything: errors iff the
    /// router cannot classify it into a known strategy.
    pub fn validate_url(locator: &str) -> Result<()> {
        match repodocs_router::detect(locator) {
            StrategyKind::Unknown => Err(RepodocsError::UnknownStrategy(locator.to_string())),
            _ => Ok(()),
        }
    }

    /// Routes, runs, and persists state for a single locator.
    #[instrument(skip(self, opts), fields(locator = %locator))]
    pub async fn run(&self, locator: &str, opts: &RunOptions) -> Result<RunOutcome> {
        let mut kind = opts
            .strategy_override
            .unwrap_or_else(|| repodocs_router::detect(locator));

        if kind == StrategyKind::Unknown {
            return Err(RepodocsError::UnknownStrategy(locator.to_string()));
        }

        let mut effective_locator = locator.to_string();

        // Per spec §4.J: a `crawler`-classified seed is promoted to
        // `sitemap` when a sitemap can be discovered for it.
        if kind == StrategyKind::Crawler {
            if let Some(sitemap_url) = repodocs_sitemap::discover(self.fetcher.as_ref(), locator).await {
                kind = StrategyKind::Sitemap;
                effective_locator = sitemap_url;
            }
        }

        let writer = Arc::new(Writer::new(WriterOptions {
            output_dir: opts.output_dir.clone(),
            flat: opts.flat,
            write_sidecar: opts.write_sidecar,
            dry_run: opts.dry_run,
            force_overwrite: opts.force_overwrite,
        }));
        let state = Arc::new(
            repodocs_state::StateStore::load(&opts.output_dir, &effective_locator, &kind.to_string(), opts.full_sync)
                .await,
        );

        let deps = StrategyDeps {
            fetcher: self.fetcher.clone(),
            renderer: self.renderer.clone(),
            cache: self.cache.clone(),
            writer,
            state: state.clone(),
        };

        let strategy = self.factory.create(kind);
        let outcome = strategy.run(&effective_locator, &deps, opts).await?;

        let pruned = if opts.prune {
            prune_deleted(&state, &outcome.seen_urls, &opts.output_dir).await
        } else {
            0
        };

        state.save().await?;

        Ok(RunOutcome {
            strategy: kind,
            documents_written: outcome.documents_written,
            errors: outcome.errors,
            pruned,
        })
    }

    /// Runs every source in `manifest` with concurrency capped at
    /// `min(manifest.options.concurrency, 3)`. When
    /// `options.continue_on_error` is false, the first failing source
    /// cancels the rest via the sources' shared cancellation token.
    #[instrument(skip(self, manifest, opts))]
    pub async fn run_manifest(&self, manifest: &Manifest, opts: &RunOptions) -> Result<ManifestOutcome> {
        let concurrency = manifest.options.concurrency.min(MAX_MANIFEST_CONCURRENCY).max(1);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
        let cancel_on_error = !manifest.options.continue_on_error;
        let shared_cancel = opts.cancel.clone();

        let mut handles = Vec::with_capacity(manifest.sources.len());
        for source in &manifest.sources {
            let semaphore = semaphore.clone();
            let url = source.url.clone();
            let mut source_opts = opts.clone();
            source_opts.output_dir = opts.output_dir.join(&manifest.options.output).clean_or_self();
            source_opts.strategy_override = source.strategy;
            source_opts.max_depth = source.max_depth.unwrap_or(opts.max_depth);
            source_opts.limit = source.limit.or(opts.limit);
            source_opts.render_js = source.render_js.unwrap_or(opts.render_js);
            if !source.exclude.is_empty() {
                source_opts.exclude_patterns = source
                    .exclude
                    .iter()
                    .filter_map(|pattern| regex::Regex::new(pattern).ok())
                    .collect();
            }
            if let Some(prefix) = &source.content_selector {
                let _ = prefix; // content/exclude selectors are consumed by the HTML sanitizer upstream of this crate, not here.
            }
            source_opts.cancel = shared_cancel.clone();

            let this_fetcher = self.fetcher.clone();
            let this_renderer = self.renderer.clone();
            let this_cache = self.cache.clone();
            let factory = DefaultStrategyFactory;
            let cancel = shared_cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                if cancel.is_cancelled() {
                    return (url, Err("cancelled".to_string()));
                }
                let orchestrator = Orchestrator::new(this_fetcher, this_renderer, this_cache)
                    .with_factory(Box::new(factory));
                match orchestrator.run(&url, &source_opts).await {
                    Ok(outcome) => (url, Ok(outcome)),
                    Err(e) => {
                        if cancel_on_error {
                            cancel.cancel();
                        }
                        (url, Err(e.to_string()))
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(pair) => results.push(pair),
                Err(e) => {
                    warn!(error = %e, "manifest source task panicked");
                }
            }
        }

        Ok(ManifestOutcome { results })
    }

    /// Idempotent: the dependency bundle holds no unmanaged resources
    /// (connections are pooled by `reqwest`, dropped with the client).
    /// Present so callers don't need to special-case teardown when a
    /// future renderer backend does hold one.
    pub async fn close(&self) -> Result<()> {
        Ok(())
    }
}

async fn prune_deleted(
    state: &repodocs_state::StateStore,
    seen_urls: &std::collections::HashSet<String>,
    output_dir: &std::path::Path,
) -> usize {
    let deleted = state.get_deleted(seen_urls).await;
    for (url, page) in &deleted {
        let path = output_dir.join(&page.file_path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(url, path = %path.display(), error = %e, "failed to remove pruned file");
        }
    }
    deleted.len()
}

trait CleanOrSelf {
    fn clean_or_self(self) -> std::path::PathBuf;
}

impl CleanOrSelf for std::path::PathBuf {
    fn clean_or_self(self) -> std::path::PathBuf {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RunOptions;
    use async_trait::async_trait;
    use repodocs_cache::CacheConfig;
    use repodocs_types::FetchResponse;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    /// Serves fixed bodies for exact URLs; unknown URLs 404. Enough to
    /// drive the orchestrator end-to-end without a real network.
    struct StubFetcher {
        pages: StdMutex<HashMap<String, (u16, String, String)>>,
    }

    impl StubFetcher {
        fn new(pages: Vec<(&str, u16, &str, &str)>) -> Self {
            Self {
                pages: StdMutex::new(
                    pages
                        .into_iter()
                        .map(|(url, status, body, ct)| (url.to_string(), (status, body.to_string(), ct.to_string())))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse> {
            let pages = self.pages.lock().unwrap();
            let (status, body, content_type) = pages
                .get(url)
                .cloned()
                .ok_or(RepodocsError::Http { status: 404 })?;
            Ok(FetchResponse {
                status,
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

    fn orchestrator_with(fetcher: StubFetcher) -> Orchestrator {
        Orchestrator::new(
            Arc::new(fetcher),
            Arc::new(repodocs_render::DisabledRenderer),
            Arc::new(repodocs_cache::Cache::new(CacheConfig::default())),
        )
    }

    fn opts_for(dir: &std::path::Path) -> RunOptions {
        RunOptions {
            output_dir: dir.to_path_buf(),
            ..RunOptions::default()
        }
    }

    #[test]
    fn validate_url_rejects_unknown_locators() {
        assert!(Orchestrator::validate_url("ftp://example.com").is_err());
        assert!(Orchestrator::validate_url("https://example.com/docs").is_ok());
    }

    #[tokio::test]
    async fn run_writes_a_single_fetch_document_for_llms_txt() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::new(vec![(
            "https://example.com/llms.txt",
            200,
            "# Example\n\nSome docs text.\n",
            "text/plain",
        )]);
        let orchestrator = orchestrator_with(fetcher);

        let outcome = orchestrator
            .run("https://example.com/llms.txt", &opts_for(dir.path()))
            .await
            .unwrap();

        assert_eq!(outcome.strategy, StrategyKind::Llms);
        assert_eq!(outcome.documents_written, 1);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn crawler_seed_is_promoted_to_sitemap_on_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::new(vec![
            ("https://example.com/robots.txt", 200, "Sitemap: /sitemap.xml\n", "text/plain"),
            (
                "https://example.com/sitemap.xml",
                200,
                "<urlset><url><loc>https://example.com/p1</loc></url></urlset>",
                "application/xml",
            ),
            ("https://example.com/p1", 200, "# P1\n\nBody text.\n", "text/markdown"),
        ]);
        let orchestrator = orchestrator_with(fetcher);

        let outcome = orchestrator
            .run("https://example.com/", &opts_for(dir.path()))
            .await
            .unwrap();

        assert_eq!(outcome.strategy, StrategyKind::Sitemap);
        assert_eq!(outcome.documents_written, 1);
        assert!(dir.path().join("example.com/p1.md").exists());
    }

    #[tokio::test]
    async fn second_run_with_unchanged_content_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::new(vec![(
            "https://example.com/llms.txt",
            200,
            "# Example\n\nSame body every time.\n",
            "text/plain",
        )]));

        for _ in 0..2 {
            let orchestrator = Orchestrator::new(
                fetcher.clone(),
                Arc::new(repodocs_render::DisabledRenderer),
                Arc::new(repodocs_cache::Cache::new(CacheConfig::default())),
            );
            orchestrator
                .run("https://example.com/llms.txt", &opts_for(dir.path()))
                .await
                .unwrap();
        }

        // Third run after an unchanged second run should still report zero
        // writes, confirming state persisted across process-scoped runs.
        let orchestrator = Orchestrator::new(
            fetcher,
            Arc::new(repodocs_render::DisabledRenderer),
            Arc::new(repodocs_cache::Cache::new(CacheConfig::default())),
        );
        let outcome = orchestrator
            .run("https://example.com/llms.txt", &opts_for(dir.path()))
            .await
            .unwrap();
        assert_eq!(outcome.documents_written, 0);
    }

    #[tokio::test]
    async fn manifest_run_continues_past_a_failing_source_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::new(vec![(
            "https://good.example.com/llms.txt",
            200,
            "# Good\n\nBody.\n",
            "text/plain",
        )]);
        let orchestrator = orchestrator_with(fetcher);

        let manifest = repodocs_types::Manifest {
            sources: vec![
                repodocs_types::ManifestSource {
                    url: "https://good.example.com/llms.txt".to_string(),
                    strategy: None,
                    content_selector: None,
                    exclude_selector: None,
                    exclude: Vec::new(),
                    include: Vec::new(),
                    max_depth: None,
                    render_js: None,
                    limit: None,
                },
                repodocs_types::ManifestSource {
                    url: "https://bad.example.com/llms.txt".to_string(),
                    strategy: None,
                    content_selector: None,
                    exclude_selector: None,
                    exclude: Vec::new(),
                    include: Vec::new(),
                    max_depth: None,
                    render_js: None,
                    limit: None,
                },
            ],
            options: repodocs_types::ManifestOptions {
                continue_on_error: true,
                output: ".".to_string(),
                concurrency: 2,
                cache_ttl: "1h".to_string(),
            },
        };

        let outcome = orchestrator
            .run_manifest(&manifest, &opts_for(dir.path()))
            .await
            .unwrap();

        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failed(), 1);
    }
}
