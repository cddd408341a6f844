//! URL normalization (spec §4.K "Normalization"). `url::Url::parse`
//! already lowercases scheme/host and collapses `.`/`..` path segments per
//! RFC 3986, so this only has to strip default ports, trailing slashes,
//! and fragments.

use url::Url;

/// Normalizes `raw` for Visited-set/Cache keying. Returns `None` if `raw`
/// does not parse as an absolute URL.
pub fn normalize(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;

    url.set_fragment(None);

    if let Some(port) = url.port() {
        let is_default =
            (url.scheme() == "http" && port == 80) || (url.scheme() == "https" && port == 443);
        if is_default {
            let _ = url.set_port(None);
        }
    }

    if url.path() != "/" && url.path().ends_with('/') {
        let trimmed = url.path().trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    Some(url.to_string())
}
