//! Sitemap discovery and the sitemap ingestion strategy (components J
//! and L).

mod discovery;
mod strategy;
mod xml_parser;

pub use discovery::discover;
pub use strategy::{run, SitemapConfig, SitemapDeps, SitemapResult};
pub use xml_parser::{parse as parse_sitemap_xml, sniff_is_sitemap, ParsedSitemap, SitemapKind};
