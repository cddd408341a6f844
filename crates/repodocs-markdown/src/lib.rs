//! Frontmatter, title/description/heading/link extraction, content hashing
//! (component E, spec §4.E).

mod frontmatter;

use frontmatter::Frontmatter;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use repodocs_types::Document;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

/// Result of reading a raw Markdown document, prior to being folded into a
/// [`Document`] by the converter pipeline.
#[derive(Debug, Clone)]
pub struct MarkdownMetadata {
    pub title: String,
    pub description: String,
    pub headings: BTreeMap<String, Vec<String>>,
    pub links: Vec<String>,
    pub content_hash: String,
    pub word_count: usize,
    pub char_count: usize,
    /// The body with any leading frontmatter fence stripped.
    pub body: String,
}

/// Reads raw Markdown text against a source URL (used to resolve relative
/// links) and extracts everything spec §4.E names.
pub fn read(raw: &str, source_url: &str) -> MarkdownMetadata {
    let (fm, body) = frontmatter::split(raw);
    let body = body.to_string();

    let headings = extract_headings(&body);
    let links = extract_links(&body, source_url);
    let (plain_text, first_paragraph) = extract_prose(&body);

    let title = title_from(&fm, &headings);
    let description = description_from(&fm, first_paragraph.as_deref());

    let content_hash = hex::encode(Sha256::digest(body.as_bytes()));
    let word_count = plain_text.split_whitespace().count();
    let char_count = plain_text.chars().count();

    MarkdownMetadata {
        title,
        description,
        headings,
        links,
        content_hash,
        word_count,
        char_count,
        body,
    }
}

fn title_from(fm: &Option<Frontmatter>, headings: &BTreeMap<String, Vec<String>>) -> String {
    if let Some(title) = fm.as_ref().and_then(|f| f.title.clone()) {
        return title.trim().trim_end_matches('#').trim().to_string();
    }
    headings
        .get("h1")
        .and_then(|texts| texts.first())
        .cloned()
        .unwrap_or_default()
}

fn description_from(fm: &Option<Frontmatter>, first_paragraph: Option<&str>) -> String {
    if let Some(fm) = fm {
        if let Some(description) = fm.description.clone().or_else(|| fm.summary.clone()) {
            return Document::truncate_description(&description);
        }
    }
    Document::truncate_description(first_paragraph.unwrap_or(""))
}

fn extract_headings(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut headings: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let parser = Parser::new(body);
    let mut current: Option<(HeadingLevel, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((level, String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    headings
                        .entry(heading_key(level))
                        .or_default()
                        .push(text.trim().to_string());
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            _ => {}
        }
    }

    headings
}

fn heading_key(level: HeadingLevel) -> String {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
    .to_string()
}

fn extract_links(body: &str, source_url: &str) -> Vec<String> {
    let base = Url::parse(source_url).ok();
    let parser = Parser::new(body);
    let mut links = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for event in parser {
        if let Event::Start(Tag::Link { dest_url, .. }) = event {
            let dest = dest_url.as_ref();
            if should_skip_link(dest) {
                continue;
            }
            let resolved = match &base {
                Some(base) => base.join(dest).ok().map(|u| u.to_string()),
                None => Url::parse(dest).ok().map(|u| u.to_string()),
            };
            if let Some(resolved) = resolved {
                if seen.insert(resolved.clone()) {
                    links.push(resolved);
                }
            }
        }
    }

    links
}

fn should_skip_link(dest: &str) -> bool {
    let trimmed = dest.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("javascript:")
        || trimmed.starts_with("mailto:")
        || trimmed.starts_with("tel:")
}

/// Returns `(plain_text_projection, first_standalone_paragraph)`. A
/// paragraph nested inside a list item does not count as the "first
/// paragraph" candidate, matching spec §4.E.
fn extract_prose(body: &str) -> (String, Option<String>) {
    let parser = Parser::new(body);
    let mut plain_text = String::new();
    let mut first_paragraph: Option<String> = None;
    let mut list_depth: usize = 0;
    let mut in_paragraph = false;
    let mut paragraph_buf = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => list_depth = list_depth.saturating_sub(1),
            Event::Start(Tag::Paragraph) => {
                in_paragraph = true;
                paragraph_buf.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                in_paragraph = false;
                if first_paragraph.is_none() && list_depth == 0 && !paragraph_buf.trim().is_empty()
                {
                    first_paragraph = Some(paragraph_buf.trim().to_string());
                }
            }
            Event::Text(text) | Event::Code(text) => {
                plain_text.push_str(&text);
                plain_text.push(' ');
                if in_paragraph {
                    paragraph_buf.push_str(&text);
                    paragraph_buf.push(' ');
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                plain_text.push(' ');
                if in_paragraph {
                    paragraph_buf.push(' ');
                }
            }
            _ => {}
        }
    }

    (plain_text, first_paragraph)
}
