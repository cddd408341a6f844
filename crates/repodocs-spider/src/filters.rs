//! Frontier admission filters: same-host, path-prefix, and exclude-regex,
//! applied to every candidate link before it is enqueued.

use regex::Regex;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub same_host_only: bool,
    pub path_prefix: Option<String>,
    pub exclude_patterns: Vec<Regex>,
}

/// True if `candidate` survives every configured filter against `seed_host`.
pub fn admits(candidate: &str, seed_host: &str, config: &FilterConfig) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };

    if config.same_host_only {
        let host = url.host_str().unwrap_or("");
        if !host.eq_ignore_ascii_case(seed_host) {
            return false;
        }
    }

    if let Some(prefix) = &config.path_prefix {
        if !url.path().starts_with(prefix.as_str()) {
            return false;
        }
    }

    for pattern in &config.exclude_patterns {
        if pattern.is_match(candidate) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_other_hosts_when_same_host_only() {
        let config = FilterConfig {
            same_host_only: true,
            ..FilterConfig::default()
        };
        assert!(!admits("https://other.com/page", "example.com", &config));
        assert!(admits("https://example.com/page", "example.com", &config));
    }

    #[test]
    fn rejects_paths_outside_prefix() {
        let config = FilterConfig {
            path_prefix: Some("/docs".to_string()),
            ..FilterConfig::default()
        };
        assert!(!admits("https://example.com/blog/post", "example.com", &config));
        assert!(admits("https://example.com/docs/intro", "example.com", &config));
    }

    #[test]
    fn rejects_excluded_patterns() {
        let config = FilterConfig {
            exclude_patterns: vec![Regex::new(r"\.pdf$").unwrap()],
            ..FilterConfig::default()
        };
        assert!(!admits("https://example.com/file.pdf", "example.com", &config));
        assert!(admits("https://example.com/file.html", "example.com", &config));
    }
}
