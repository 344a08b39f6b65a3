//! State module for tracking crawl progress
//!
//! This module provides the mutable state of a single crawl run.
//!
//! # Components
//!
//! - `Frontier`: priority queue of collections and items still to visit
//! - `VisitedSets`: deduplication of collections, items and emitted files
//! - `YieldStats`: per-collection yield counters used for scoring
//! - `CrawlStatus`: loosely consistent progress snapshot shared with the heartbeat

mod frontier;
mod status;
mod visited;
mod yield_stats;

// Re-export main types
pub use frontier::{Frontier, FrontierNode, NodeKind, PriorityDecay};
pub use status::{CrawlPhase, CrawlStatus, RequestRecord, StatusSnapshot};
pub use visited::VisitedSets;
pub use yield_stats::{CollectionYield, YieldStats, BASELINE_RATIO};

/// Everything the crawl loop mutates, owned by the coordinator
#[derive(Debug, Default)]
pub struct CrawlState {
    pub frontier: Frontier,
    pub visited: VisitedSets,
    pub stats: YieldStats,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }
}
