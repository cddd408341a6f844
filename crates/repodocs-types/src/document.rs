use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The unit flowing through the converter pipeline: one extracted page.
///
/// Created by the pipeline once a fetch (or cache replay) completes;
/// immutable thereafter; consumed by the Writer and State Store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Stable key: the URL this document was extracted from.
    pub source_url: String,
    pub title: String,
    /// Truncated to 300 chars with an ellipsis; see [`Document::with_description`].
    pub description: String,
    /// Cleaned Markdown body.
    pub body: String,
    /// Lowercase hex SHA-256 of `body`.
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
    /// "h1".."h6" -> ordered heading texts.
    pub headings: BTreeMap<String, Vec<String>>,
    /// Ordered, deduplicated absolute outbound links.
    pub links: Vec<String>,
    pub word_count: usize,
    pub char_count: usize,
    pub rendered_with_js: bool,
    pub strategy: String,
    pub cache_hit: bool,
}

const MAX_DESCRIPTION_CHARS: usize = 300;

impl Document {
    /// Truncate `raw` to [`MAX_DESCRIPTION_CHARS`] characters, appending an
    /// ellipsis when truncation actually occurred.
    pub fn truncate_description(raw: &str) -> String {
        let trimmed = raw.trim();
        let char_count = trimmed.chars().count();
        if char_count <= MAX_DESCRIPTION_CHARS {
            return trimmed.to_string();
        }
        let mut truncated: String = trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect();
        truncated.push('\u{2026}');
        truncated
    }
}

/// Sidecar JSON metadata written alongside a `Document`'s Markdown body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub description: String,
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
    pub word_count: usize,
    pub char_count: usize,
    pub headings: BTreeMap<String, Vec<String>>,
    pub links: Vec<String>,
    pub source_url: String,
    pub strategy: String,
    pub rendered_with_js: bool,
}

impl From<&Document> for DocumentMetadata {
    fn from(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            description: doc.description.clone(),
            content_hash: doc.content_hash.clone(),
            fetched_at: doc.fetched_at,
            word_count: doc.word_count,
            char_count: doc.char_count,
            headings: doc.headings.clone(),
            links: doc.links.clone(),
            source_url: doc.source_url.clone(),
            strategy: doc.strategy.clone(),
            rendered_with_js: doc.rendered_with_js,
        }
    }
}
