//! Frontier priority queue
//!
//! This module handles:
//! - Ordering pending collections and items by priority (highest first)
//! - Stable tie-breaking so equal priorities pop in insertion order
//! - Re-weighing queued collections from observed yield

use crate::state::YieldStats;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// What a frontier node refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A collection whose item listing is paged through
    Collection,
    /// A single item identifier
    Identifier,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::Identifier => write!(f, "identifier"),
        }
    }
}

/// A pending unit of crawl work
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierNode {
    /// Higher values are popped first
    pub priority: f64,

    pub kind: NodeKind,

    /// Collection or item identifier
    pub value: String,

    /// Distance from the seed that led here
    pub depth: u32,

    /// Collection whose statistics score this node
    pub stats_key: Option<String>,
}

impl FrontierNode {
    /// A collection node scored by its own statistics
    pub fn collection(value: impl Into<String>, priority: f64, depth: u32) -> Self {
        let value = value.into();
        Self {
            priority,
            kind: NodeKind::Collection,
            stats_key: Some(value.clone()),
            value,
            depth,
        }
    }

    /// An item node; items carry no statistics key
    pub fn identifier(value: impl Into<String>, priority: f64, depth: u32) -> Self {
        Self {
            priority,
            kind: NodeKind::Identifier,
            value: value.into(),
            depth,
            stats_key: None,
        }
    }
}

/// How unconfirmed collections lose priority on every re-weigh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityDecay {
    pub factor: f64,
    pub floor: f64,
}

impl Default for PriorityDecay {
    fn default() -> Self {
        Self {
            factor: 0.95,
            floor: 0.1,
        }
    }
}

impl PriorityDecay {
    fn apply(&self, priority: f64) -> f64 {
        (priority * self.factor).max(self.floor)
    }
}

/// Heap entry: a node plus its insertion sequence number
#[derive(Debug)]
struct Queued {
    node: FrontierNode,
    seq: u64,
}

// Higher priority pops first; among equal priorities the older entry wins
impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node
            .priority
            .total_cmp(&other.node.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

/// Priority-ordered queue of not-yet-processed crawl nodes
///
/// The same collection may be queued several times when several items
/// reference it; the crawl loop drops the extra copies when they are popped.
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the frontier
    pub fn push(&mut self, node: FrontierNode) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Queued { node, seq });
    }

    /// Removes and returns the highest-priority node
    pub fn pop(&mut self) -> Option<FrontierNode> {
        self.heap.pop().map(|queued| queued.node)
    }

    /// Priority of the node [`Frontier::pop`] would return next
    pub fn peek_priority(&self) -> Option<f64> {
        self.heap.peek().map(|queued| queued.node.priority)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Iterates over queued nodes in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &FrontierNode> {
        self.heap.iter().map(|queued| &queued.node)
    }

    /// Re-scores every queued collection node
    ///
    /// Collections with observed items get `1.0 + ratio`, which puts any
    /// proven collection ahead of every speculative one. The rest decay
    /// towards the floor but stay reachable. Identifier nodes keep their
    /// priority.
    pub fn reprioritize_all(&mut self, stats: &YieldStats, decay: PriorityDecay) {
        let mut entries = std::mem::take(&mut self.heap).into_vec();

        for entry in entries.iter_mut() {
            let node = &mut entry.node;
            if node.kind != NodeKind::Collection {
                continue;
            }

            node.priority = match node.stats_key.as_deref() {
                Some(key) if stats.has_items(key) => 1.0 + stats.ratio(key),
                _ => decay.apply(node.priority),
            };
        }

        self.heap = BinaryHeap::from(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(frontier: &mut Frontier) -> Vec<String> {
        std::iter::from_fn(|| frontier.pop()).map(|n| n.value).collect()
    }

    #[test]
    fn test_new_frontier_is_empty() {
        let mut frontier = Frontier::new();
        assert!(frontier.is_empty());
        assert_eq!(frontier.len(), 0);
        assert!(frontier.pop().is_none());
        assert!(frontier.peek_priority().is_none());
    }

    #[test]
    fn test_pop_returns_highest_priority() {
        let mut frontier = Frontier::new();
        frontier.push(FrontierNode::collection("low", 0.2, 1));
        frontier.push(FrontierNode::collection("high", 1.5, 1));
        frontier.push(FrontierNode::identifier("mid", 1.0, 0));
        frontier.push(FrontierNode::collection("lowest", 0.1, 2));

        assert_eq!(frontier.peek_priority(), Some(1.5));
        assert_eq!(drain(&mut frontier), vec!["high", "mid", "low", "lowest"]);
    }

    #[test]
    fn test_ties_pop_in_insertion_order() {
        let mut frontier = Frontier::new();
        for name in ["a", "b", "c", "d"] {
            frontier.push(FrontierNode::collection(name, 0.5, 1));
        }
        frontier.push(FrontierNode::collection("first", 0.9, 1));

        assert_eq!(drain(&mut frontier), vec!["first", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_interleaved_push_pop_keeps_max() {
        let mut frontier = Frontier::new();
        frontier.push(FrontierNode::collection("x", 0.3, 1));
        frontier.push(FrontierNode::collection("y", 0.7, 1));
        assert_eq!(frontier.pop().unwrap().value, "y");

        frontier.push(FrontierNode::collection("z", 0.4, 1));
        assert_eq!(frontier.pop().unwrap().value, "z");
        assert_eq!(frontier.pop().unwrap().value, "x");
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_reprioritize_promotes_proven_collections() {
        let mut frontier = Frontier::new();
        frontier.push(FrontierNode::collection("speculative", 0.5, 1));
        frontier.push(FrontierNode::collection("proven", 0.5, 1));
        frontier.push(FrontierNode::identifier("item", 1.0, 0));

        let mut stats = YieldStats::new();
        stats.record("proven", 4, 1);

        frontier.reprioritize_all(&stats, PriorityDecay::default());

        let order: Vec<_> = std::iter::from_fn(|| frontier.pop()).collect();
        assert_eq!(order[0].value, "proven");
        assert!((order[0].priority - 1.25).abs() < 1e-9);
        assert_eq!(order[1].value, "item");
        assert_eq!(order[1].priority, 1.0);
        assert_eq!(order[2].value, "speculative");
        assert!((order[2].priority - 0.475).abs() < 1e-9);
    }

    #[test]
    fn test_decay_is_floored() {
        let mut frontier = Frontier::new();
        frontier.push(FrontierNode::collection("stale", 0.105, 3));

        let stats = YieldStats::new();
        let decay = PriorityDecay::default();
        for _ in 0..10 {
            frontier.reprioritize_all(&stats, decay);
        }

        assert_eq!(frontier.peek_priority(), Some(0.1));
    }

    #[test]
    fn test_collection_with_zero_items_decays() {
        let mut frontier = Frontier::new();
        frontier.push(FrontierNode::collection("visited-empty", 0.5, 1));

        let mut stats = YieldStats::new();
        stats.record("visited-empty", 0, 0);

        frontier.reprioritize_all(&stats, PriorityDecay { factor: 0.5, floor: 0.0 });
        assert_eq!(frontier.peek_priority(), Some(0.25));
    }

    #[test]
    fn test_reprioritize_changes_pop_order() {
        let mut frontier = Frontier::new();
        frontier.push(FrontierNode::collection("a", 0.9, 1));
        frontier.push(FrontierNode::collection("b", 0.4, 1));

        let mut stats = YieldStats::new();
        stats.record("b", 10, 0);

        frontier.reprioritize_all(&stats, PriorityDecay::default());

        // b has evidence (ratio 0) and now sits at 1.0, ahead of a's 0.855
        assert_eq!(drain(&mut frontier), vec!["b", "a"]);
    }
}
