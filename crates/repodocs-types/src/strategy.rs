use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy classification produced by the router (component I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Git,
    Llms,
    PkgGo,
    DocsRs,
    Sitemap,
    Wiki,
    GithubPages,
    Crawler,
    Unknown,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::Git => "git",
            StrategyKind::Llms => "llms",
            StrategyKind::PkgGo => "pkggo",
            StrategyKind::DocsRs => "docsrs",
            StrategyKind::Sitemap => "sitemap",
            StrategyKind::Wiki => "wiki",
            StrategyKind::GithubPages => "github_pages",
            StrategyKind::Crawler => "crawler",
            StrategyKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}
