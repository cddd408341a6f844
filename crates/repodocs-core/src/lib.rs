//! Strategy router + orchestration core (components I and M). Ties the
//! router, the crawl/sitemap/single-fetch strategies, and the dependency
//! bundle (fetcher, renderer, cache, writer, state store) into the single
//! entry point the outer CLI calls.

mod options;
mod orchestrator;
mod strategy;

pub use options::{ManifestOutcome, RunOptions, RunOutcome};
pub use orchestrator::Orchestrator;
pub use strategy::{
    CrawlerStrategy, DefaultStrategyFactory, GitStrategy, SingleFetchStrategy, SitemapStrategy,
    Strategy, StrategyDeps, StrategyFactory, StrategyOutcome,
};
