//! Per-collection yield statistics used to score the frontier

use serde::Serialize;
use std::collections::BTreeMap;

/// Ratio assumed for collections with no observed items yet
pub const BASELINE_RATIO: f64 = 0.5;

/// Running yield counters for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionYield {
    /// Items listed under the collection that this crawl has visited
    #[serde(rename = "items")]
    pub items_seen: u64,

    /// New files emitted while traversing the collection
    #[serde(rename = "files")]
    pub files_found: u64,
}

/// Per-collection yield statistics
///
/// Only used to score frontier entries; nothing about crawl correctness
/// depends on these numbers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct YieldStats {
    collections: BTreeMap<String, CollectionYield>,
}

impl YieldStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the deltas to a collection's counters, creating the entry on first use
    pub fn record(&mut self, collection: &str, items_delta: u64, files_delta: u64) {
        let entry = self.collections.entry(collection.to_string()).or_default();
        entry.items_seen += items_delta;
        entry.files_found += files_delta;
    }

    /// Files found per item seen, or [`BASELINE_RATIO`] without evidence
    pub fn ratio(&self, collection: &str) -> f64 {
        match self.collections.get(collection) {
            Some(stats) if stats.items_seen > 0 => {
                stats.files_found as f64 / stats.items_seen.max(1) as f64
            }
            _ => BASELINE_RATIO,
        }
    }

    /// Returns true once at least one item of the collection has been seen
    pub fn has_items(&self, collection: &str) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|stats| stats.items_seen > 0)
    }

    pub fn get(&self, collection: &str) -> Option<&CollectionYield> {
        self.collections.get(collection)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CollectionYield)> {
        self.collections.iter()
    }
}
