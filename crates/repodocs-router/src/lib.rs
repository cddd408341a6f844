//! Pure `locator → strategy` classification (component I, spec §4.I). No
//! network I/O; deterministic and side-effect-free so callers can re-run
//! it freely.

use repodocs_types::StrategyKind;
use url::Url;

const KNOWN_GIT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

/// Classifies a textual locator — an http(s) URL, an SSH-form git
/// reference, or a filesystem path — into a [`StrategyKind`]. Evaluation
/// order is first-match-wins, per spec §4.I.
pub fn detect(locator: &str) -> StrategyKind {
    let trimmed = locator.trim();

    // 1. SSH-git prefixes.
    if trimmed.starts_with("git@") || trimmed.starts_with("git+ssh://") {
        return StrategyKind::Git;
    }

    // 2. git:// scheme is explicitly unsupported.
    if starts_with_ci(trimmed, "git://") {
        return StrategyKind::Unknown;
    }

    // 3. Parse as URL; malformed-but-http(s)-looking input still routes to crawler.
    let Ok(url) = Url::parse(trimmed) else {
        return if starts_with_ci(trimmed, "http://") || starts_with_ci(trimmed, "https://") {
            StrategyKind::Crawler
        } else {
            StrategyKind::Unknown
        };
    };

    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    let path = url.path().to_ascii_lowercase();

    // 4. llms.txt.
    if path.ends_with("llms.txt") {
        return StrategyKind::Llms;
    }

    // 5. pkg.go.dev.
    if host.contains("pkg.go.dev") {
        return StrategyKind::PkgGo;
    }

    // 6. docs.rs, excluding source-browser paths.
    if host.contains("docs.rs") && !path.contains("/src/") && !path.contains("/source/") {
        return StrategyKind::DocsRs;
    }

    // 7. Sitemap XML.
    if path.ends_with("sitemap.xml")
        || path.ends_with("sitemap.xml.gz")
        || (path.contains("sitemap") && path.ends_with(".xml"))
    {
        return StrategyKind::Sitemap;
    }

    // 8. Wiki recognizer: .../wiki[/...] on a known git host.
    if is_known_git_host(&host) && is_wiki_path(&path) {
        return StrategyKind::Wiki;
    }

    // 9. GitHub Pages, excluding documentation subdomains.
    let is_docs_subdomain = host == "docs.github.com" || host == "pages.github.io";
    if host.ends_with("github.io") && !is_docs_subdomain {
        return StrategyKind::GithubPages;
    }

    // 10. .git suffix, or a known git host outside blob views.
    if path.ends_with(".git") {
        return StrategyKind::Git;
    }
    if !is_docs_subdomain
        && is_known_git_host(&host)
        && !path.contains("/blob/")
        && !path.contains("/-/blob/")
    {
        return StrategyKind::Git;
    }

    // 11. Any remaining http(s) URL.
    if scheme == "http" || scheme == "https" {
        return StrategyKind::Crawler;
    }

    // 12. Otherwise unknown.
    StrategyKind::Unknown
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_known_git_host(host: &str) -> bool {
    KNOWN_GIT_HOSTS.iter().any(|known| host == *known || host.ends_with(&format!(".{known}")))
}

fn is_wiki_path(path: &str) -> bool {
    path.split('/').any(|segment| segment == "wiki")
}
