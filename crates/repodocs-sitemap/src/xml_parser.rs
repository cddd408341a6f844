//! Sitemap XML parsing via `xml::reader::EventReader`, grounded on
//! `riptide-spider/src/sitemap.rs`'s `SitemapParser`, but tracking the
//! current element name explicitly rather than sniffing "starts with
//! http" on bare character data — needed here to tell a `<sitemapindex>`
//! apart from a `<urlset>`.

use flate2::read::GzDecoder;
use repodocs_types::{RepodocsError, Result};
use std::io::Read;
use xml::reader::{EventReader, XmlEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    UrlSet,
    SitemapIndex,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedSitemap {
    pub kind: Option<SitemapKind>,
    /// `<loc>` entries under `<url>` (a leaf sitemap) or `<sitemap>` (an index).
    pub locations: Vec<String>,
}

/// Transparently gunzips `body` if it looks gzip-compressed, then parses
/// the XML, returning the sitemap kind and every `<loc>` it contains.
pub fn parse(body: &[u8]) -> Result<ParsedSitemap> {
    let decompressed;
    let xml_bytes: &[u8] = if is_gzip(body) {
        let mut decoder = GzDecoder::new(body);
        let mut buf = Vec::new();
        decoder
            .read_to_end(&mut buf)
            .map_err(|e| RepodocsError::Parse(format!("gzip decompress: {e}")))?;
        decompressed = buf;
        &decompressed
    } else {
        body
    };

    let reader = EventReader::new(xml_bytes);
    let mut parsed = ParsedSitemap::default();
    let mut element_stack: Vec<String> = Vec::new();
    let mut loc_buf = String::new();

    for event in reader {
        let event = event.map_err(|e| RepodocsError::Parse(format!("sitemap xml: {e}")))?;
        match event {
            XmlEvent::StartElement { name, .. } => {
                let local = name.local_name.to_ascii_lowercase();
                if local == "urlset" {
                    parsed.kind = Some(SitemapKind::UrlSet);
                } else if local == "sitemapindex" {
                    parsed.kind = Some(SitemapKind::SitemapIndex);
                } else if local == "loc" {
                    loc_buf.clear();
                }
                element_stack.push(local);
            }
            XmlEvent::Characters(data) => {
                if element_stack.last().map(String::as_str) == Some("loc") {
                    loc_buf.push_str(&data);
                }
            }
            XmlEvent::EndElement { name } => {
                let local = name.local_name.to_ascii_lowercase();
                if local == "loc" && !loc_buf.trim().is_empty() {
                    parsed.locations.push(loc_buf.trim().to_string());
                }
                element_stack.pop();
            }
            _ => {}
        }
    }

    Ok(parsed)
}

/// Sniffs raw bytes for a sitemap root element, for probing arbitrary
/// `.xml`-suffixed URLs during discovery.
pub fn sniff_is_sitemap(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(&body[..body.len().min(4096)]);
    text.contains("<urlset") || text.contains("<sitemapindex")
}

fn is_gzip(body: &[u8]) -> bool {
    body.len() >= 2 && body[0] == 0x1f && body[1] == 0x8b
}
