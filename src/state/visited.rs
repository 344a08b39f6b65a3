//! Deduplication sets
//!
//! Tracks which collections and items have been visited and which
//! `(identifier, file_name)` pairs have already been emitted.

use std::collections::HashSet;

/// The three deduplication sets of a crawl run
///
/// Nodes are marked when their processing begins, so a node that fails halfway
/// is never queued again by references discovered later. File keys are only
/// marked when the file is actually emitted.
#[derive(Debug, Default)]
pub struct VisitedSets {
    collections: HashSet<String>,
    items: HashSet<String>,
    files: HashSet<(String, String)>,
}

impl VisitedSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_collection(&self, collection: &str) -> bool {
        self.collections.contains(collection)
    }

    /// Marks a collection visited; returns false if it already was
    pub fn insert_collection(&mut self, collection: &str) -> bool {
        self.collections.insert(collection.to_string())
    }

    pub fn contains_item(&self, identifier: &str) -> bool {
        self.items.contains(identifier)
    }

    /// Marks an item visited; returns false if it already was
    pub fn insert_item(&mut self, identifier: &str) -> bool {
        self.items.insert(identifier.to_string())
    }

    pub fn contains_file(&self, identifier: &str, file_name: &str) -> bool {
        self.files
            .contains(&(identifier.to_string(), file_name.to_string()))
    }

    /// Marks a file emitted; returns false if it already was
    pub fn insert_file(&mut self, identifier: &str, file_name: &str) -> bool {
        self.files
            .insert((identifier.to_string(), file_name.to_string()))
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
