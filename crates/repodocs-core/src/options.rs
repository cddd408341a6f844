//! Per-run configuration threaded through the orchestrator and every
//! strategy (spec §4.M).

use regex::Regex;
use repodocs_types::StrategyKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub flat: bool,
    pub write_sidecar: bool,
    pub dry_run: bool,
    pub force_overwrite: bool,
    /// Ignore prior sync state entirely: every page is treated as changed.
    pub full_sync: bool,
    pub max_depth: u32,
    pub worker_count: usize,
    pub politeness_delay: (Duration, Duration),
    pub same_host_only: bool,
    pub path_prefix: Option<String>,
    pub exclude_patterns: Vec<Regex>,
    pub limit: Option<usize>,
    /// Force every fetch through the renderer rather than the plain fetcher.
    pub render_js: bool,
    /// Bypasses router classification entirely when set.
    pub strategy_override: Option<StrategyKind>,
    /// Remove on-disk files for pages that were tracked by the prior sync
    /// but were not revisited this run.
    pub prune: bool,
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./docs"),
            flat: false,
            write_sidecar: true,
            dry_run: false,
            force_overwrite: false,
            full_sync: false,
            max_depth: 3,
            worker_count: 4,
            politeness_delay: (Duration::ZERO, Duration::ZERO),
            same_host_only: true,
            path_prefix: None,
            exclude_patterns: Vec::new(),
            limit: None,
            render_js: false,
            strategy_override: None,
            prune: false,
            cancel: CancellationToken::new(),
        }
    }
}

/// Outcome of a single [`crate::Orchestrator::run`] invocation.
#[derive(Debug)]
pub struct RunOutcome {
    pub strategy: StrategyKind,
    pub documents_written: usize,
    pub errors: Vec<String>,
    pub pruned: usize,
}

impl RunOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of a [`crate::Orchestrator::run_manifest`] invocation: one
/// [`RunOutcome`] (or failure) per source, in source order.
#[derive(Debug, Default)]
pub struct ManifestOutcome {
    pub results: Vec<(String, Result<RunOutcome, String>)>,
}

impl ManifestOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }
}
