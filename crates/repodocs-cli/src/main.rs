//! Thin entry point for the repodocs documentation extractor.
//!
//! Everything interesting lives in `repodocs-core`; this binary only
//! parses flags, assembles the dependency bundle, and maps the
//! orchestrator's outcome onto a process exit code (spec §6: 0 success,
//! 1 any error returned from `Run`, 2 router `unknown`).

mod exit;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repodocs_cache::{Cache, CacheConfig};
use repodocs_core::{Orchestrator, RunOptions};
use repodocs_fetch::{FetcherConfig, ReqwestFetcher};
use repodocs_render::DisabledRenderer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use exit::ExitCode;

#[derive(Parser)]
#[command(name = "repodocs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extracts a normalized Markdown documentation tree from a web source", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract documentation from a single locator (URL, git ref, or manifest path).
    Run(RunArgs),
    /// Extract documentation for every source in a manifest file.
    Batch(BatchArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// URL, `git@host:owner/repo` reference, or manifest path to extract.
    locator: String,

    #[command(flatten)]
    opts: SharedOpts,
}

#[derive(Parser)]
struct BatchArgs {
    /// Path to a YAML or JSON manifest.
    manifest: PathBuf,

    #[command(flatten)]
    opts: SharedOpts,
}

#[derive(Parser, Clone)]
struct SharedOpts {
    /// Output directory for the generated documentation tree.
    #[arg(long, default_value = "./docs")]
    output: PathBuf,

    /// Write every document to a single flat directory instead of nested paths.
    #[arg(long)]
    flat: bool,

    /// Write a `.json` metadata sidecar alongside each document.
    #[arg(long, default_value_t = true)]
    sidecar: bool,

    /// Compute paths and log actions without touching disk.
    #[arg(long)]
    dry_run: bool,

    /// Overwrite output files even when the content hash matches prior state.
    #[arg(long)]
    force: bool,

    /// Ignore prior sync state; treat every page as changed. Incremental
    /// sync against the prior state is the default otherwise.
    #[arg(long)]
    full_sync: bool,

    /// Remove output files for pages no longer present upstream.
    #[arg(long)]
    prune: bool,

    /// Maximum crawl depth from the seed URL.
    #[arg(long, default_value_t = 3)]
    max_depth: u32,

    /// Number of concurrent crawl workers.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Maximum number of documents to write before stopping.
    #[arg(long)]
    limit: Option<usize>,

    /// Minimum politeness delay between requests from one worker, e.g. "250ms".
    #[arg(long, default_value = "0ms")]
    delay_min: String,

    /// Maximum politeness delay between requests from one worker.
    #[arg(long, default_value = "0ms")]
    delay_max: String,

    /// Render every page with a headless browser instead of a plain fetch.
    #[arg(long)]
    render_js: bool,

    /// Restrict the crawl to URLs under this path prefix.
    #[arg(long)]
    filter_url: Option<String>,

    /// Regex an outbound URL must NOT match to be enqueued. Repeatable.
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Per-request HTTP timeout, e.g. "15s".
    #[arg(long, default_value = "15s")]
    timeout: String,

    /// Cache TTL before an entry is treated as a miss, e.g. "1h".
    #[arg(long, default_value = "1h")]
    cache_ttl: String,

    /// Continue with remaining manifest sources after one fails (batch mode only).
    #[arg(long)]
    continue_on_error: bool,
}

impl SharedOpts {
    fn to_run_options(&self, cancel: CancellationToken) -> Result<RunOptions> {
        let exclude_patterns = self
            .exclude
            .iter()
            .map(|p| regex::Regex::new(p).with_context(|| format!("invalid --exclude pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;

        Ok(RunOptions {
            output_dir: self.output.clone(),
            flat: self.flat,
            write_sidecar: self.sidecar,
            dry_run: self.dry_run,
            force_overwrite: self.force,
            full_sync: self.full_sync,
            max_depth: self.max_depth,
            worker_count: self.concurrency.max(1),
            politeness_delay: (parse_duration(&self.delay_min)?, parse_duration(&self.delay_max)?),
            same_host_only: true,
            path_prefix: self.filter_url.clone(),
            exclude_patterns,
            limit: self.limit,
            render_js: self.render_js,
            strategy_override: None,
            prune: self.prune,
            cancel,
        })
    }
}

/// Parses `"30s"`, `"5m"`, `"1h"`, `"500ms"`, or a bare integer of seconds.
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    if let Some(num) = s.strip_suffix("ms") {
        return Ok(Duration::from_millis(num.parse()?));
    }
    if let Some(num) = s.strip_suffix('s') {
        return Ok(Duration::from_secs(num.parse()?));
    }
    if let Some(num) = s.strip_suffix('m') {
        return Ok(Duration::from_secs(num.parse::<u64>()? * 60));
    }
    if let Some(num) = s.strip_suffix('h') {
        return Ok(Duration::from_secs(num.parse::<u64>()? * 3600));
    }
    Ok(Duration::from_secs(s.parse()?))
}

fn build_orchestrator(cache_ttl: Duration, timeout: Duration) -> Result<Orchestrator> {
    let fetcher = Arc::new(ReqwestFetcher::new(FetcherConfig {
        timeout,
        ..FetcherConfig::default()
    })?);
    let renderer = Arc::new(DisabledRenderer);
    let cache = Arc::new(Cache::new(CacheConfig { ttl: cache_ttl }));
    Ok(Orchestrator::new(fetcher, renderer, cache))
}

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run_single(args).await,
        Commands::Batch(args) => run_batch(args).await,
    };

    match result {
        Ok(code) => code.as_i32(),
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::RunError.as_i32()
        }
    }
}

async fn run_single(args: RunArgs) -> Result<ExitCode> {
    if let Err(e) = Orchestrator::validate_url(&args.locator) {
        tracing::error!(locator = %args.locator, error = %e, "locator rejected by router");
        return Ok(ExitCode::UnknownLocator);
    }

    let cache_ttl = parse_duration(&args.opts.cache_ttl)?;
    let timeout = parse_duration(&args.opts.timeout)?;
    let orchestrator = build_orchestrator(cache_ttl, timeout)?;
    let cancel = install_cancellation();
    let opts = args.opts.to_run_options(cancel)?;

    let outcome = orchestrator.run(&args.locator, &opts).await?;
    orchestrator.close().await?;

    tracing::info!(
        strategy = %outcome.strategy,
        written = outcome.documents_written,
        failed = outcome.errors.len(),
        pruned = outcome.pruned,
        "run complete"
    );

    Ok(ExitCode::Success)
}

async fn run_batch(args: BatchArgs) -> Result<ExitCode> {
    let mut manifest = repodocs_manifest::load(&args.manifest)?;
    manifest.options.continue_on_error = manifest.options.continue_on_error || args.opts.continue_on_error;

    let cache_ttl = parse_duration(&args.opts.cache_ttl)?;
    let timeout = parse_duration(&args.opts.timeout)?;
    let orchestrator = build_orchestrator(cache_ttl, timeout)?;
    let cancel = install_cancellation();
    let opts = args.opts.to_run_options(cancel)?;

    let outcome = orchestrator.run_manifest(&manifest, &opts).await?;
    orchestrator.close().await?;

    let succeeded = outcome.succeeded();
    let failed = outcome.failed();
    tracing::info!(succeeded, failed, total = outcome.results.len(), "batch complete");
    for (url, result) in &outcome.results {
        if let Err(e) = result {
            tracing::warn!(url, error = %e, "source failed");
        }
    }

    Ok(if failed > 0 { ExitCode::RunError } else { ExitCode::Success })
}

/// Cancels the run's token on SIGINT so in-flight workers observe it on
/// their next suspension point (spec §5: "no goroutine outlives `Run`").
fn install_cancellation() -> CancellationToken {
    let cancel = CancellationToken::new();
    let signalled = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signalled.cancel();
        }
    });
    cancel
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
