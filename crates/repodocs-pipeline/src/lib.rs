//! Converter pipeline (component F, spec §4.F): sanitize → convert →
//! extract metadata → hash, composing [`repodocs_html`] and
//! [`repodocs_markdown`].

use chrono::Utc;
use repodocs_html::{sanitize, SanitizeOptions};
use repodocs_types::{Document, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::instrument;
use url::Url;

/// The two content kinds the pipeline knows how to turn into a `Document`.
/// Anything else (images, PDFs, other binary assets) is not one of these
/// and is never written — spec §6 "other types → not written" and spec
/// §9's `include_assets` default of `false`.
enum ContentKind {
    Html,
    Markdown,
}

/// Public entry point: turns a raw fetch body into a [`Document`], or
/// `None` when `content_type` is not one of the discriminated kinds spec
/// §6 names (`text/html*`, `text/markdown`, `text/plain` ending `.md` or
/// `.txt`) — callers must not write a `Document` for those.
///
/// HTML content is sanitized then converted to Markdown before metadata
/// extraction; Markdown content-types pass straight to the Markdown reader.
/// An empty body of a recognized content-type is not an error — it
/// produces a `Document` with an empty body and title.
#[instrument(skip(raw_body), fields(url = %url, content_type = %content_type))]
pub fn process(
    url: &str,
    raw_body: &[u8],
    content_type: &str,
    rendered_with_js: bool,
    strategy: &str,
) -> Result<Option<Document>> {
    let Some(kind) = classify(content_type, url) else {
        return Ok(None);
    };

    let text = String::from_utf8_lossy(raw_body);

    let markdown_body = match kind {
        ContentKind::Html => {
            let base = Url::parse(url).ok();
            let options = SanitizeOptions {
                remove_navigation: true,
                base_url: base,
            };
            let cleaned = sanitize(&text, &options);
            repodocs_html::html_to_markdown(&cleaned)?
        }
        ContentKind::Markdown => text.into_owned(),
    };

    if markdown_body.trim().is_empty() {
        return Ok(Some(empty_document(url, rendered_with_js, strategy)));
    }

    let meta = repodocs_markdown::read(&markdown_body, url);

    Ok(Some(Document {
        source_url: url.to_string(),
        title: meta.title,
        description: meta.description,
        body: meta.body,
        content_hash: meta.content_hash,
        fetched_at: Utc::now(),
        headings: meta.headings,
        links: meta.links,
        word_count: meta.word_count,
        char_count: meta.char_count,
        rendered_with_js,
        strategy: strategy.to_string(),
        cache_hit: false,
    }))
}

/// Spec §6's content-type discrimination: `text/html*` and
/// `text/markdown` are always recognized; `text/plain` only when the
/// URL path ends `.md` or `.txt`. Everything else — images, PDFs,
/// `application/octet-stream`, and so on — is not written.
fn classify(content_type: &str, url: &str) -> Option<ContentKind> {
    let lowered = content_type.to_ascii_lowercase();
    let base_type = lowered.split(';').next().unwrap_or("").trim().to_string();

    if base_type.contains("html") || base_type.contains("xhtml") {
        return Some(ContentKind::Html);
    }
    if base_type == "text/markdown" {
        return Some(ContentKind::Markdown);
    }
    if base_type == "text/plain" {
        let path = Url::parse(url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| url.to_ascii_lowercase());
        if path.ends_with(".md") || path.ends_with(".txt") {
            return Some(ContentKind::Markdown);
        }
    }
    None
}

fn empty_document(url: &str, rendered_with_js: bool, strategy: &str) -> Document {
    Document {
        source_url: url.to_string(),
        title: String::new(),
        description: String::new(),
        body: String::new(),
        content_hash: hex::encode(Sha256::digest(b"")),
        fetched_at: Utc::now(),
        headings: BTreeMap::new(),
        links: Vec::new(),
        word_count: 0,
        char_count: 0,
        rendered_with_js,
        strategy: strategy.to_string(),
        cache_hit: false,
    }
}
