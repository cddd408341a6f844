//! DOM cleaning (spec §4.D). Operates on the serialized HTML string between
//! passes: each step re-parses a `scraper::Html` tree, finds the elements to
//! drop or rewrite via CSS selectors, then edits the owning string by
//! replacing each matched element's outer HTML — the same select-then-
//! string-replace idiom the pack uses for DOM surgery, since `scraper`
//! trees are read-only once parsed.

use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::instrument;
use url::Url;

const REMOVED_TAGS: &[&str] = &[
    "script", "style", "iframe", "form", "input", "button", "select", "textarea", "header",
    "footer", "aside", "noscript", "svg",
];

const AD_SELECTORS: &[&str] = &[
    "[class*=\"advert\"]",
    "[class*=\"banner\"]",
    "[id*=\"advert\"]",
    "[id*=\"banner\"]",
];

const NAV_TOKENS: &[&str] = &[
    "nav", "navbar", "navigation", "menu", "sidebar", "breadcrumb", "breadcrumbs", "toc",
    "table-of-contents", "skip-link",
];

/// Configuration for a single [`sanitize`] call.
#[derive(Debug, Clone, Default)]
pub struct SanitizeOptions {
    /// Strip elements whose class/id match [`NAV_TOKENS`], plus all `<nav>`.
    pub remove_navigation: bool,
    /// Resolve `href`/`src`/`srcset` to absolute URLs against this base.
    pub base_url: Option<Url>,
}

/// Cleans raw HTML per spec §4.D's five ordered steps and returns the
/// resulting HTML string.
#[instrument(skip(html, options))]
pub fn sanitize(html: &str, options: &SanitizeOptions) -> String {
    let mut current = html.to_string();

    current = remove_by_selectors(&current, &fixed_tag_selectors());

    if options.remove_navigation {
        current = remove_by_selectors(&current, &navigation_selectors());
    }

    current = remove_hidden(&current);

    if let Some(base) = &options.base_url {
        current = absolutize_references(&current, base);
    }

    current = remove_empty_blocks(&current);

    current
}

fn fixed_tag_selectors() -> Vec<String> {
    let mut selectors: Vec<String> = REMOVED_TAGS.iter().map(|t| t.to_string()).collect();
    selectors.extend(AD_SELECTORS.iter().map(|s| s.to_string()));
    selectors
}

fn navigation_selectors() -> Vec<String> {
    let mut selectors = vec!["nav".to_string()];
    for token in NAV_TOKENS {
        selectors.push(format!("[class~=\"{token}\"]"));
        selectors.push(format!("[id=\"{token}\"]"));
    }
    selectors
}

fn remove_by_selectors(html: &str, selector_strs: &[String]) -> String {
    let document = Html::parse_document(html);
    let mut cleaned = document.html();
    let mut removed: HashSet<String> = HashSet::new();

    for selector_str in selector_strs {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let outer = element.html();
            if !outer.is_empty() && removed.insert(outer.clone()) {
                cleaned = cleaned.replace(&outer, "");
            }
        }
    }

    cleaned
}

fn remove_hidden(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut cleaned = document.html();

    let Ok(any) = Selector::parse("*") else {
        return cleaned;
    };
    for element in document.select(&any) {
        let value = element.value();
        let is_hidden = value.attr("hidden").is_some()
            || value
                .attr("style")
                .map(|s| s.replace(' ', "").contains("display:none"))
                .unwrap_or(false);
        if is_hidden {
            let outer = element.html();
            if !outer.is_empty() {
                cleaned = cleaned.replace(&outer, "");
            }
        }
    }

    cleaned
}

fn absolutize_references(html: &str, base: &Url) -> String {
    let document = Html::parse_document(html);
    let mut cleaned = document.html();

    let Ok(selector) = Selector::parse("[href], [src], [srcset]") else {
        return cleaned;
    };

    for element in document.select(&selector) {
        for attr in ["href", "src", "srcset"] {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            if should_skip_reference(value) {
                continue;
            }
            if attr == "srcset" {
                if let Some(rewritten) = absolutize_srcset(value, base) {
                    cleaned = replace_attr_value(&cleaned, attr, value, &rewritten);
                }
            } else if let Ok(resolved) = base.join(value) {
                cleaned = replace_attr_value(&cleaned, attr, value, resolved.as_str());
            }
        }
    }

    cleaned
}

fn should_skip_reference(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("javascript:")
        || trimmed.starts_with("mailto:")
        || trimmed.starts_with("data:")
}

fn absolutize_srcset(value: &str, base: &Url) -> Option<String> {
    let mut parts = Vec::new();
    let mut changed = false;
    for candidate in value.split(',') {
        let candidate = candidate.trim();
        let mut pieces = candidate.splitn(2, char::is_whitespace);
        let url_part = pieces.next().unwrap_or("");
        let descriptor = pieces.next().unwrap_or("").trim();
        if should_skip_reference(url_part) {
            parts.push(candidate.to_string());
            continue;
        }
        if let Ok(resolved) = base.join(url_part) {
            changed = true;
            if descriptor.is_empty() {
                parts.push(resolved.to_string());
            } else {
                parts.push(format!("{resolved} {descriptor}"));
            }
        } else {
            parts.push(candidate.to_string());
        }
    }
    changed.then(|| parts.join(", "))
}

fn replace_attr_value(html: &str, attr: &str, old: &str, new: &str) -> String {
    let needle_double = format!("{attr}=\"{old}\"");
    let needle_single = format!("{attr}='{old}'");
    if html.contains(&needle_double) {
        html.replacen(&needle_double, &format!("{attr}=\"{new}\""), 1)
    } else if html.contains(&needle_single) {
        html.replacen(&needle_single, &format!("{attr}=\"{new}\""), 1)
    } else {
        html.to_string()
    }
}

fn remove_empty_blocks(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut cleaned = document.html();

    let Ok(selector) = Selector::parse("p, div, span, section, article") else {
        return cleaned;
    };

    for element in document.select(&selector) {
        let has_element_children = element.children().any(|c| c.value().is_element());
        let text_is_empty = element.text().collect::<String>().trim().is_empty();
        if text_is_empty && !has_element_children {
            let outer = element.html();
            if !outer.is_empty() {
                cleaned = cleaned.replace(&outer, "");
            }
        }
    }

    cleaned
}
