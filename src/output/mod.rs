//! Output module for crawl results
//!
//! This module handles:
//! - Streaming discovered files as JSONL
//! - Exporting per-collection yield statistics as JSON
//! - Printing the end-of-run summary

mod jsonl;
pub mod stats;
mod traits;

pub use jsonl::JsonlSink;
pub use stats::{print_report, write_stats_json};
pub use traits::{DiscoveredFile, OutputError, OutputResult, ResultSink};
