//! Sitemap discovery (component J, spec §4.J). Failure of any probe is
//! never fatal — logged and ignored, since the seed still crawls fine as
//! a plain `crawler` source.

use crate::xml_parser;
use repodocs_fetch::Fetcher;
use tracing::{debug, instrument};
use url::Url;

/// Probes, in order, for a sitemap that should promote the strategy from
/// `crawler` to `sitemap`:
/// 1. `<origin>/robots.txt` for `Sitemap:` directives.
/// 2. `<origin>/sitemap.xml`, accepted on HTTP 200.
/// 3. If the seed URL itself ends in `.xml`, sniff its body.
#[instrument(skip(fetcher), fields(seed = %seed_url))]
pub async fn discover(fetcher: &dyn Fetcher, seed_url: &str) -> Option<String> {
    let origin = origin_of(seed_url)?;

    if let Some(found) = probe_robots_txt(fetcher, &origin).await {
        return Some(found);
    }

    let candidate = format!("{origin}/sitemap.xml");
    if let Ok(resp) = fetcher.get(&candidate).await {
        if resp.is_success() {
            return Some(candidate);
        }
    }

    if seed_url.to_ascii_lowercase().ends_with(".xml") {
        if let Ok(resp) = fetcher.get(seed_url).await {
            if resp.is_success() && xml_parser::sniff_is_sitemap(&resp.body) {
                return Some(seed_url.to_string());
            }
        }
    }

    None
}

async fn probe_robots_txt(fetcher: &dyn Fetcher, origin: &str) -> Option<String> {
    let robots_url = format!("{origin}/robots.txt");
    let resp = fetcher.get(&robots_url).await.ok()?;
    if !resp.is_success() {
        return None;
    }
    let body = resp.body_as_str();

    for line in body.lines() {
        let trimmed = line.trim();
        let Some(rest) = strip_sitemap_directive(trimmed) else {
            continue;
        };
        let candidate = rest.trim();
        if let Ok(parsed) = Url::parse(candidate) {
            if parsed.scheme() == "http" || parsed.scheme() == "https" {
                debug!(sitemap = %candidate, "found Sitemap: directive in robots.txt");
                return Some(candidate.to_string());
            }
        }
    }
    None
}

fn strip_sitemap_directive(line: &str) -> Option<&str> {
    let lower = line.to_ascii_lowercase();
    if lower.starts_with("sitemap:") {
        Some(&line[("sitemap:".len())..])
    } else {
        None
    }
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    Some(parsed.origin().ascii_serialization())
}
