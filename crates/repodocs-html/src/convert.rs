//! HTML → Markdown conversion (spec §4.F's conversion step), delegated to
//! `htmd`, which preserves heading levels, links, code blocks, and tables
//! out of the box.

use repodocs_types::{RepodocsError, Result};

pub fn html_to_markdown(html: &str) -> Result<String> {
    htmd::convert(html).map_err(|e| RepodocsError::Parse(format!("html to markdown: {e}")))
}
