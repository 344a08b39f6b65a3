//! IA ISO Spider main entry point
//!
//! This is the command-line interface for the yield-guided disk-image spider.

use anyhow::Context;
use clap::Parser;
use iso_spider::config::{read_config, validate, Config};
use iso_spider::crawler::run_crawl;
use iso_spider::output::print_report;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// IA ISO Spider: a yield-guided disk-image discoverer
///
/// Starting from a few seed identifiers, the spider walks Internet Archive
/// collections and items, following parent-collection links outward and
/// recording every disk image it finds. Collections that keep producing
/// files are explored first.
#[derive(Parser, Debug)]
#[command(name = "ia-iso-spider")]
#[command(version = "1.0.0")]
#[command(about = "A yield-guided Internet Archive disk-image spider", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed identifiers (collections or items)
    #[arg(long, num_args = 1..)]
    seeds: Option<Vec<String>>,

    /// Maximum number of collection and item visits
    #[arg(long, value_name = "N")]
    max_visits: Option<u64>,

    /// Maximum collection depth from the seeds
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Rows per search page
    #[arg(long, value_name = "N")]
    rows: Option<u32>,

    /// Delay between requests, in seconds
    #[arg(long, value_name = "SECS")]
    sleep: Option<f64>,

    /// Per-request timeout, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Retries for transient failures
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Exponential backoff factor
    #[arg(long, value_name = "F")]
    backoff: Option<f64>,

    /// Stop after this many consecutive collections without new files
    #[arg(long, value_name = "N")]
    stop_on_dry_spell: Option<u32>,

    /// Heartbeat interval, in seconds
    #[arg(long, value_name = "SECS")]
    heartbeat: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Where to write discovered files (JSON Lines)
    #[arg(long, value_name = "PATH")]
    out_jsonl: Option<String>,

    /// Where to write per-collection statistics (JSON)
    #[arg(long, value_name = "PATH")]
    stats_json: Option<String>,

    /// Mirror log output to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(seeds) = &self.seeds {
            config.seeds = seeds.clone();
        }
        if let Some(max_visits) = self.max_visits {
            config.crawler.max_visits = max_visits;
        }
        if let Some(max_depth) = self.max_depth {
            config.crawler.max_depth = max_depth;
        }
        if let Some(rows) = self.rows {
            config.crawler.rows = rows;
        }
        if let Some(sleep) = self.sleep {
            config.crawler.request_delay_ms = (sleep.max(0.0) * 1000.0).round() as u64;
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.http.retries = retries;
        }
        if let Some(backoff) = self.backoff {
            config.http.backoff_factor = backoff;
        }
        if let Some(dry_spell) = self.stop_on_dry_spell {
            config.crawler.stop_on_dry_spell = dry_spell;
        }
        if let Some(heartbeat) = self.heartbeat {
            config.heartbeat.interval_secs = heartbeat;
        }
        if let Some(user_agent) = &self.user_agent {
            config.http.user_agent = user_agent.clone();
        }
        if let Some(path) = &self.out_jsonl {
            config.output.results_path = path.clone();
        }
        if let Some(path) = &self.stats_json {
            config.output.stats_path = path.clone();
        }
        if let Some(path) = &self.log_file {
            config.output.log_file = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = read_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };
    cli.apply_overrides(&mut config);

    setup_logging(cli.verbose, cli.quiet, config.output.log_file.as_deref().map(Path::new))?;

    match (&cli.config, &config_hash) {
        (Some(path), Some(hash)) => {
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash)
        }
        _ => tracing::info!("No configuration file given, using defaults"),
    }

    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Console output always goes to stdout; when `log_file` is set the same
/// events are appended there without ANSI colouring.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("iso_spider=info,ia_iso_spider=info,warn"),
            1 => EnvFilter::new("iso_spider=debug,ia_iso_spider=debug,info"),
            2 => EnvFilter::new("iso_spider=trace,ia_iso_spider=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== IA ISO Spider Dry Run ===\n");

    println!("Seeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\nCrawler Configuration:");
    println!("  Max visits: {}", config.crawler.max_visits);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Rows per page: {}", config.crawler.rows);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Stop on dry spell: {}", config.crawler.stop_on_dry_spell);
    println!(
        "  Priority decay: {} (floor {})",
        config.crawler.priority_decay, config.crawler.priority_floor
    );
    println!("  Extensions: {}", config.crawler.extensions.join(", "));

    println!("\nHTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Retries: {}", config.http.retries);
    println!("  Backoff factor: {}", config.http.backoff_factor);
    println!("  User agent: {}", config.http.user_agent);

    println!("\nEndpoints:");
    println!("  Search: {}", config.endpoints.search_url);
    println!("  Metadata: {}", config.endpoints.metadata_url);
    println!("  Downloads: {}", config.endpoints.download_base);

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_path);
    println!("  Stats: {}", config.output.stats_path);
    if let Some(log_file) = &config.output.log_file {
        println!("  Log file: {}", log_file);
    }
    println!("  Heartbeat: every {}s", config.heartbeat.interval_secs);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl with {} seeds (max_visits={}, max_depth={})",
        config.seeds.len(),
        config.crawler.max_visits,
        config.crawler.max_depth
    );

    let results_path = config.output.results_path.clone();
    let stats_path = config.output.stats_path.clone();

    let report = match run_crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report);
    println!(
        "Discovered {} ISO files. Results saved to {} Stats saved to {}",
        report.total_files, results_path, stats_path
    );

    Ok(())
}
