//! Sitemap ingestion strategy (component L, spec §4.L): enumerate URLs
//! from sitemap XML (recursing through `<sitemapindex>` up to a bounded
//! depth) and feed them through a bounded worker pool that reuses the
//! Fetcher, Converter Pipeline, Writer, and State Store. No link
//! traversal — this is a flat enumeration, not a crawl.

use crate::xml_parser::{self, SitemapKind};
use repodocs_cache::Cache;
use repodocs_fetch::Fetcher;
use repodocs_spider::FilterConfig;
use repodocs_state::StateStore;
use repodocs_types::{PageState, Result};
use repodocs_writer::Writer;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

const MAX_SITEMAPINDEX_DEPTH: u32 = 3;

pub struct SitemapDeps {
    pub fetcher: Arc<dyn Fetcher>,
    pub cache: Arc<Cache>,
    pub writer: Arc<Writer>,
    pub state: Arc<StateStore>,
}

#[derive(Debug, Clone)]
pub struct SitemapConfig {
    pub worker_count: usize,
    pub filters: FilterConfig,
    pub limit: Option<usize>,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            filters: FilterConfig::default(),
            limit: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SitemapResult {
    pub documents_written: usize,
    pub seen_urls: HashSet<String>,
    pub errors: Vec<String>,
}

/// Fetches and recursively resolves `sitemap_url` to a flat URL list, then
/// processes each one concurrently.
#[instrument(skip(deps), fields(sitemap = %sitemap_url))]
pub async fn run(sitemap_url: &str, config: SitemapConfig, deps: SitemapDeps) -> Result<SitemapResult> {
    let seed_host = url::Url::parse(sitemap_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default();

    let urls = resolve_urls(sitemap_url, &deps.fetcher, 0).await?;
    let filtered: Vec<String> = urls
        .into_iter()
        .filter(|u| repodocs_spider::normalize(u).is_some())
        .filter(|u| admits(u, &seed_host, &config.filters))
        .collect();

    let written = Arc::new(AtomicUsize::new(0));
    let seen: Arc<std::sync::Mutex<HashSet<String>>> = Arc::new(std::sync::Mutex::new(HashSet::new()));
    let errors: Arc<tokio::sync::Mutex<Vec<String>>> = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let semaphore = Arc::new(Semaphore::new(config.worker_count.max(1)));
    let deps = Arc::new(deps);

    let mut handles = Vec::with_capacity(filtered.len());
    for url in filtered {
        if let Some(limit) = config.limit {
            if written.load(Ordering::Relaxed) >= limit {
                break;
            }
        }
        let semaphore = semaphore.clone();
        let deps = deps.clone();
        let written = written.clone();
        let seen = seen.clone();
        let errors = errors.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            seen.lock().unwrap().insert(url.clone());
            match process_one(&url, &deps).await {
                Ok(wrote) => {
                    if wrote {
                        written.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "sitemap item failed");
                    errors.lock().await.push(format!("{url}: {e}"));
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let seen_urls = Arc::try_unwrap(seen)
        .ok()
        .and_then(|m| m.into_inner().ok())
        .unwrap_or_default();

    Ok(SitemapResult {
        documents_written: written.load(Ordering::Relaxed),
        seen_urls,
        errors: Arc::try_unwrap(errors).map(tokio::sync::Mutex::into_inner).unwrap_or_default(),
    })
}

/// Returns whether a document was actually written (as opposed to
/// skipped — either unsupported content-type or unchanged content).
async fn process_one(url: &str, deps: &SitemapDeps) -> Result<bool> {
    let response = if let Some((cached, _)) = deps.cache.lookup(url) {
        cached
    } else {
        let resp = deps.fetcher.get(url).await?;
        deps.cache.store(url, resp.clone());
        resp
    };

    let Some(document) = repodocs_pipeline::process(url, &response.body, &response.content_type, false, "sitemap")?
    else {
        debug!(url, content_type = %response.content_type, "unsupported content-type, skipping");
        return Ok(false);
    };

    if deps.state.should_process(url, &document.content_hash).await {
        let path = deps.writer.write(&document).await?;
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
        Ok(true)
    } else {
        debug!(url, "unchanged, skipping write");
        Ok(false)
    }
}

fn admits(url: &str, seed_host: &str, filters: &FilterConfig) -> bool {
    repodocs_spider::admits(url, seed_host, filters)
}

async fn resolve_urls(sitemap_url: &str, fetcher: &Arc<dyn Fetcher>, depth: u32) -> Result<Vec<String>> {
    if depth > MAX_SITEMAPINDEX_DEPTH {
        warn!(sitemap = %sitemap_url, "sitemapindex recursion depth exceeded, stopping");
        return Ok(Vec::new());
    }

    let response = fetcher.get(sitemap_url).await?;
    let parsed = xml_parser::parse(&response.body)?;

    match parsed.kind {
        Some(SitemapKind::SitemapIndex) => {
            let mut all = Vec::new();
            for child in parsed.locations {
                match Box::pin(resolve_urls(&child, fetcher, depth + 1)).await {
                    Ok(mut urls) => all.append(&mut urls),
                    Err(e) => warn!(sitemap = %child, error = %e, "failed to fetch child sitemap"),
                }
            }
            Ok(all)
        }
        Some(SitemapKind::UrlSet) | None => Ok(parsed.locations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodocs_cache::CacheConfig;
    use repodocs_fetch::{FetcherConfig, ReqwestFetcher};
    use repodocs_writer::WriterOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn enumerates_urlset_and_writes_each_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{}/a</loc></url><url><loc>{}/b</loc></url></urlset>",
                server.uri(),
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>A</h1><p>Page A body.</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>B</h1><p>Page B body.</p>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(ReqwestFetcher::new(FetcherConfig::default()).unwrap());
        let deps = SitemapDeps {
            fetcher,
            cache: Arc::new(Cache::new(CacheConfig::default())),
            writer: Arc::new(Writer::new(WriterOptions {
                output_dir: dir.path().to_path_buf(),
                ..WriterOptions::default()
            })),
            state: Arc::new(StateStore::load(dir.path(), &server.uri(), "sitemap", false).await),
        };

        let result = run(
            &format!("{}/sitemap.xml", server.uri()),
            SitemapConfig::default(),
            deps,
        )
        .await
        .unwrap();

        assert_eq!(result.documents_written, 2);
        assert!(result.errors.is_empty());
    }
}
