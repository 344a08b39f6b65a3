//! Crawler module for collection and item discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and request pacing
//! - Advanced-search pagination over collections
//! - Item metadata resolution and file extraction
//! - Periodic heartbeat reporting
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod heartbeat;
mod metadata;
mod search;

pub use coordinator::{Coordinator, CrawlOutcome, CrawlReport};
pub use fetcher::{build_http_client, HttpClient, HttpResponse, RetryPolicy};
pub use heartbeat::{format_hms, Heartbeat, HeartbeatLine, MIN_HEARTBEAT_INTERVAL};
pub use metadata::{
    extract_parent_collections, FileEntry, ItemMetadata, ItemRecord, MetadataResolver,
};
pub use search::{total_pages, CollectionSearch, SearchDoc, SearchPage};

use crate::config::{validate, Config};
use crate::output::{write_stats_json, JsonlSink};
use crate::SpiderError;
use std::path::PathBuf;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the JSON Lines results file (truncating it)
/// 2. Build the HTTP client and resolvers
/// 3. Seed the frontier and run the crawl loop
/// 4. Write the per-collection statistics file
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed and both output files were written
/// * `Err(SpiderError)` - Invalid configuration or an output failure
pub async fn run_crawl(config: Config) -> Result<CrawlReport, SpiderError> {
    let results_path = PathBuf::from(&config.output.results_path);
    let stats_path = PathBuf::from(&config.output.stats_path);

    validate(&config)?;
    let sink = JsonlSink::create(&results_path)?;
    let mut coordinator = Coordinator::new(config, Box::new(sink))?;
    let report = coordinator.run().await?;

    write_stats_json(&stats_path, &report.stats)?;
    tracing::info!(
        "Wrote {} results to {} and stats to {}",
        report.total_files,
        results_path.display(),
        stats_path.display()
    );

    Ok(report)
}
