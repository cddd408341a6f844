//! Strategy dispatch (component M, spec §4.M). The router only classifies
//! a locator; a [`Strategy`] is the thing that actually fetches and writes
//! documents for it. Two strategies carry real behavior — `crawler` and
//! `sitemap` — the rest are thin, matching how little the specification
//! says about them beyond routing.

use crate::options::RunOptions;
use async_trait::async_trait;
use repodocs_cache::Cache;
use repodocs_fetch::Fetcher;
use repodocs_render::Renderer;
use repodocs_sitemap::{SitemapConfig, SitemapDeps};
use repodocs_spider::{CrawlConfig, CrawlDeps, FilterConfig};
use repodocs_state::StateStore;
use repodocs_types::{PageState, RepodocsError, Result, StrategyKind};
use repodocs_writer::Writer;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Dependency bundle a [`Strategy`] borrows for the lifetime of one run.
/// Built per-invocation by the orchestrator: `fetcher`/`renderer`/`cache`
/// are shared process-wide resources, `writer`/`state` are scoped to the
/// run's output directory.
pub struct StrategyDeps {
    pub fetcher: Arc<dyn Fetcher>,
    pub renderer: Arc<dyn Renderer>,
    pub cache: Arc<Cache>,
    pub writer: Arc<Writer>,
    pub state: Arc<StateStore>,
}

#[derive(Debug, Default)]
pub struct StrategyOutcome {
    pub documents_written: usize,
    pub seen_urls: HashSet<String>,
    pub errors: Vec<String>,
}

#[async_trait]
pub trait Strategy: Send + Sync {
    async fn run(&self, locator: &str, deps: &StrategyDeps, opts: &RunOptions) -> Result<StrategyOutcome>;
}

/// Produces a [`Strategy`] implementation for a classified locator.
/// Overridable so tests can substitute stub strategies without touching
/// the orchestrator.
pub trait StrategyFactory: Send + Sync {
    fn create(&self, kind: StrategyKind) -> Box<dyn Strategy>;
}

/// The factory wired up by [`crate::Orchestrator::new`].
pub struct DefaultStrategyFactory;

impl StrategyFactory for DefaultStrategyFactory {
    fn create(&self, kind: StrategyKind) -> Box<dyn Strategy> {
        match kind {
            StrategyKind::Crawler | StrategyKind::Wiki | StrategyKind::GithubPages => {
                Box::new(CrawlerStrategy { kind })
            }
            StrategyKind::Sitemap => Box::new(SitemapStrategy),
            StrategyKind::Llms | StrategyKind::PkgGo | StrategyKind::DocsRs => {
                Box::new(SingleFetchStrategy { kind })
            }
            StrategyKind::Git => Box::new(GitStrategy),
            StrategyKind::Unknown => Box::new(NullStrategy),
        }
    }
}

fn filter_config(opts: &RunOptions) -> FilterConfig {
    FilterConfig {
        same_host_only: opts.same_host_only,
        path_prefix: opts.path_prefix.clone(),
        exclude_patterns: opts.exclude_patterns.clone(),
    }
}

/// `crawler`, `wiki`, and `github_pages` all traverse outbound links from a
/// seed page; the specification details only the `crawler` traversal
/// algorithm (§4.K), so wiki and GitHub Pages sources reuse it verbatim.
/// For `wiki`, the seed's own `/wiki` path segment becomes the default
/// path prefix when the caller didn't set one, so a wiki crawl doesn't
/// wander into the rest of the host.
pub struct CrawlerStrategy {
    kind: StrategyKind,
}

#[async_trait]
impl Strategy for CrawlerStrategy {
    async fn run(&self, locator: &str, deps: &StrategyDeps, opts: &RunOptions) -> Result<StrategyOutcome> {
        let mut filters = filter_config(opts);
        if self.kind == StrategyKind::Wiki && filters.path_prefix.is_none() {
            filters.path_prefix = wiki_path_prefix(locator);
        }

        let config = CrawlConfig {
            max_depth: opts.max_depth,
            worker_count: opts.worker_count.max(1),
            politeness_delay: opts.politeness_delay,
            filters,
            limit: opts.limit,
            force_render: opts.render_js,
        };
        let crawl_deps = CrawlDeps {
            fetcher: deps.fetcher.clone(),
            renderer: deps.renderer.clone(),
            cache: deps.cache.clone(),
            writer: deps.writer.clone(),
            state: deps.state.clone(),
        };

        let result = repodocs_spider::crawl(locator, config, crawl_deps, opts.cancel.clone()).await?;
        Ok(StrategyOutcome {
            documents_written: result.documents_written,
            seen_urls: result.seen_urls,
            errors: result.errors,
        })
    }
}

fn wiki_path_prefix(locator: &str) -> Option<String> {
    let url = url::Url::parse(locator).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let wiki_index = segments.iter().position(|s| *s == "wiki")?;
    Some(format!("/{}", segments[..=wiki_index].join("/")))
}

/// Flat enumeration of a sitemap, no link traversal. Delegates entirely to
/// [`repodocs_sitemap::run`] (spec §4.L).
pub struct SitemapStrategy;

#[async_trait]
impl Strategy for SitemapStrategy {
    async fn run(&self, locator: &str, deps: &StrategyDeps, opts: &RunOptions) -> Result<StrategyOutcome> {
        let config = SitemapConfig {
            worker_count: opts.worker_count.max(1),
            filters: filter_config(opts),
            limit: opts.limit,
        };
        let sitemap_deps = SitemapDeps {
            fetcher: deps.fetcher.clone(),
            cache: deps.cache.clone(),
            writer: deps.writer.clone(),
            state: deps.state.clone(),
        };

        let result = repodocs_sitemap::run(locator, config, sitemap_deps).await?;
        Ok(StrategyOutcome {
            documents_written: result.documents_written,
            seen_urls: result.seen_urls,
            errors: result.errors,
        })
    }
}

/// `llms`, `pkggo`, and `docsrs` sources: the specification gives the
/// router rules that route to them but no further operational detail, so
/// each is a single fetch through the converter pipeline — no link
/// traversal.
pub struct SingleFetchStrategy {
    kind: StrategyKind,
}

#[async_trait]
impl Strategy for SingleFetchStrategy {
    async fn run(&self, locator: &str, deps: &StrategyDeps, opts: &RunOptions) -> Result<StrategyOutcome> {
        let mut seen_urls = HashSet::new();
        seen_urls.insert(locator.to_string());

        let response = if opts.render_js {
            deps.renderer.render(locator).await?
        } else if let Some((cached, _)) = deps.cache.lookup(locator) {
            cached
        } else {
            let resp = deps.fetcher.get(locator).await?;
            deps.cache.store(locator, resp.clone());
            resp
        };

        let document = repodocs_pipeline::process(
            locator,
            &response.body,
            &response.content_type,
            opts.render_js,
            &self.kind.to_string(),
        )?;

        let mut documents_written = 0;
        if let Some(document) = document {
            if deps.state.should_process(locator, &document.content_hash).await {
                let path = deps.writer.write(&document).await?;
                deps.state
                    .update(
                        locator,
                        PageState {
                            content_hash: document.content_hash.clone(),
                            fetched_at: document.fetched_at,
                            file_path: path,
                        },
                    )
                    .await;
                documents_written = 1;
            }
        }

        Ok(StrategyOutcome {
            documents_written,
            seen_urls,
            errors: Vec::new(),
        })
    }
}

/// The router dispatches `git`/`git+ssh` locators here, but the
/// repository-walking logic that would follow is explicitly out of scope
/// — this strategy only confirms the dispatch happened.
pub struct GitStrategy;

#[async_trait]
impl Strategy for GitStrategy {
    async fn run(&self, locator: &str, _deps: &StrategyDeps, _opts: &RunOptions) -> Result<StrategyOutcome> {
        info!(locator, "git strategy matched; repository walking is not implemented");
        Ok(StrategyOutcome::default())
    }
}

/// Never instantiated in normal operation — [`crate::Orchestrator::run`]
/// rejects `StrategyKind::Unknown` before a factory lookup happens. Exists
/// so [`StrategyFactory::create`] stays a total function.
struct NullStrategy;

#[async_trait]
impl Strategy for NullStrategy {
    async fn run(&self, locator: &str, _deps: &StrategyDeps, _opts: &RunOptions) -> Result<StrategyOutcome> {
        Err(RepodocsError::UnknownStrategy(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiki_prefix_is_the_path_up_to_and_including_wiki() {
        let prefix = wiki_path_prefix("https://github.com/owner/repo/wiki/Home");
        assert_eq!(prefix, Some("/owner/repo/wiki".to_string()));
    }

    #[test]
    fn wiki_prefix_is_none_without_a_wiki_segment() {
        assert_eq!(wiki_path_prefix("https://github.com/owner/repo"), None);
    }

    #[test]
    fn default_factory_maps_every_kind_to_a_strategy() {
        let factory = DefaultStrategyFactory;
        for kind in [
            StrategyKind::Crawler,
            StrategyKind::Wiki,
            StrategyKind::GithubPages,
            StrategyKind::Sitemap,
            StrategyKind::Llms,
            StrategyKind::PkgGo,
            StrategyKind::DocsRs,
            StrategyKind::Git,
            StrategyKind::Unknown,
        ] {
            let _strategy = factory.create(kind);
        }
    }
}
