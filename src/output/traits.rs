//! Output sink traits and types
//!
//! This module defines the trait interface for result sinks and the record
//! they receive.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A disk-image file found in an item record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    /// Item identifier the file belongs to
    pub identifier: String,

    /// Item title (may be empty)
    pub title: String,

    /// File name inside the item, possibly with sub-directories
    pub file_name: String,

    /// Direct download URL
    pub download_url: String,

    /// Size as reported by the service, or "unknown"
    pub size: String,
}

/// Destination for discovered files
///
/// A failing sink is the only thing that aborts a crawl, so implementations
/// should surface every write error instead of swallowing it.
pub trait ResultSink: Send {
    /// Writes one record; it must be durable once this returns
    fn emit(&mut self, file: &DiscoveredFile) -> OutputResult<()>;

    /// Flushes anything still buffered
    fn finish(&mut self) -> OutputResult<()>;
}

/// Collects records in memory
impl ResultSink for Vec<DiscoveredFile> {
    fn emit(&mut self, file: &DiscoveredFile) -> OutputResult<()> {
        self.push(file.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
