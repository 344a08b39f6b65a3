//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Classifying and seeding the frontier
//! - Paging through collections and resolving their items
//! - Deduplicating visits and emitted files
//! - Feeding yield statistics back into frontier priorities
//! - Enforcing the visit, depth and dry-spell limits

use crate::config::{validate, Config};
use crate::crawler::fetcher::HttpClient;
use crate::crawler::heartbeat::Heartbeat;
use crate::crawler::metadata::{extract_parent_collections, ItemRecord, MetadataResolver};
use crate::crawler::search::{total_pages, CollectionSearch};
use crate::output::ResultSink;
use crate::state::{
    CrawlPhase, CrawlState, CrawlStatus, FrontierNode, NodeKind, PriorityDecay, YieldStats,
};
use crate::SpiderError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why the crawl loop ended; all three are normal completions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Nothing left in the frontier
    Exhausted,
    /// The visit budget was used up
    LimitReached,
    /// Too many consecutive collections yielded no new files
    DryStreakStopped,
}

impl std::fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted => write!(f, "frontier exhausted"),
            Self::LimitReached => write!(f, "visit limit reached"),
            Self::DryStreakStopped => write!(f, "stopped on dry streak"),
        }
    }
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub visits: u64,
    pub total_files: u64,
    pub visited_items: usize,
    pub visited_collections: usize,
    pub frontier_remaining: usize,
    pub elapsed: Duration,
    /// Final per-collection yield statistics
    pub stats: YieldStats,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    search: CollectionSearch,
    resolver: MetadataResolver,
    state: CrawlState,
    sink: Box<dyn ResultSink>,
    status: Arc<CrawlStatus>,
    decay: PriorityDecay,
    visits: u64,
    total_files: u64,
    dry_streak: u32,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration; validated here
    /// * `sink` - Where discovered files are written
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SpiderError)` - Invalid configuration or HTTP client setup failure
    pub fn new(config: Config, sink: Box<dyn ResultSink>) -> Result<Self, SpiderError> {
        validate(&config)?;

        let status = Arc::new(CrawlStatus::new(config.crawler.max_visits));
        let http = HttpClient::new(&config.http, &config.crawler, Some(status.clone()))?;
        let search = CollectionSearch::new(http.clone(), &config.endpoints, &config.crawler);
        let resolver = MetadataResolver::new(http, &config.endpoints, &config.crawler)?;
        let decay = PriorityDecay {
            factor: config.crawler.priority_decay,
            floor: config.crawler.priority_floor,
        };

        Ok(Self {
            config,
            search,
            resolver,
            state: CrawlState::new(),
            sink,
            status,
            decay,
            visits: 0,
            total_files: 0,
            dry_streak: 0,
        })
    }

    /// Shared status handle, as read by the heartbeat
    pub fn status(&self) -> Arc<CrawlStatus> {
        self.status.clone()
    }

    /// Current crawl state (frontier, visited sets, statistics)
    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the crawl to one of its terminal conditions
    ///
    /// The heartbeat runs alongside the loop and is stopped before this
    /// returns, whether the crawl finished or a sink failure aborted it.
    pub async fn run(&mut self) -> Result<CrawlReport, SpiderError> {
        let started = Instant::now();
        let heartbeat = Heartbeat::spawn(
            self.status.clone(),
            Duration::from_secs(self.config.heartbeat.interval_secs),
        );

        let result = self.crawl().await;

        self.status.set_phase(CrawlPhase::Draining);
        self.publish_progress();
        self.status.stop();
        heartbeat.stop().await;

        let outcome = result?;
        self.sink.finish()?;
        self.status.set_phase(CrawlPhase::Finished);

        tracing::info!(
            "Finished crawl ({}). Visits={}, total_files={}, unique_items={}, unique_collections={}",
            outcome,
            self.visits,
            self.total_files,
            self.state.visited.item_count(),
            self.state.visited.collection_count()
        );

        Ok(CrawlReport {
            outcome,
            visits: self.visits,
            total_files: self.total_files,
            visited_items: self.state.visited.item_count(),
            visited_collections: self.state.visited.collection_count(),
            frontier_remaining: self.state.frontier.len(),
            elapsed: started.elapsed(),
            stats: self.state.stats.clone(),
        })
    }

    async fn crawl(&mut self) -> Result<CrawlOutcome, SpiderError> {
        self.seed().await;
        self.status.set_phase(CrawlPhase::Looping);

        loop {
            self.publish_progress();

            if self.state.frontier.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                return Ok(CrawlOutcome::Exhausted);
            }
            if self.visits >= self.config.crawler.max_visits {
                tracing::info!("Visit limit of {} reached", self.config.crawler.max_visits);
                return Ok(CrawlOutcome::LimitReached);
            }

            let Some(node) = self.state.frontier.pop() else {
                return Ok(CrawlOutcome::Exhausted);
            };

            match node.kind {
                NodeKind::Collection => {
                    if let Some(outcome) = self.visit_collection(&node).await? {
                        return Ok(outcome);
                    }
                }
                NodeKind::Identifier => self.visit_identifier(&node).await?,
            }
        }
    }

    /// Classifies each seed and queues it at depth 0
    async fn seed(&mut self) {
        self.status.set_phase(CrawlPhase::Seeding);

        for seed in self.config.seeds.clone() {
            let node = match self.resolver.classify(&seed).await {
                NodeKind::Collection => FrontierNode::collection(seed.as_str(), 1.0, 0),
                NodeKind::Identifier => FrontierNode::identifier(seed.as_str(), 1.0, 0),
            };
            tracing::info!("Seed '{}' classified as {}", seed, node.kind);
            self.state.frontier.push(node);
        }
    }

    /// Visits a collection node; returns an outcome if the crawl should stop
    async fn visit_collection(
        &mut self,
        node: &FrontierNode,
    ) -> Result<Option<CrawlOutcome>, SpiderError> {
        let collection = node.value.as_str();

        if self.state.visited.contains_collection(collection) {
            tracing::debug!("Skip seen collection {}", collection);
            return Ok(None);
        }
        if node.depth > self.config.crawler.max_depth {
            tracing::debug!(
                "Skip {} due to depth {} > {}",
                collection,
                node.depth,
                self.config.crawler.max_depth
            );
            return Ok(None);
        }

        self.state.visited.insert_collection(collection);
        self.visits += 1;
        tracing::info!(
            "[C] Visiting collection '{}' (depth={}) | visits={}/{}",
            collection,
            node.depth,
            self.visits,
            self.config.crawler.max_visits
        );

        let Some(new_files) = self.traverse_collection(collection, node.depth).await? else {
            return Ok(None);
        };

        self.state.stats.record(collection, 0, new_files);
        let items = self
            .state
            .stats
            .get(collection)
            .map_or(0, |stats| stats.items_seen);
        tracing::info!(
            "[C] Done {}: items={}, files_found_now={}, total_files={}",
            collection,
            items,
            new_files,
            self.total_files
        );

        if new_files == 0 {
            self.dry_streak += 1;
        } else {
            self.dry_streak = 0;
        }

        self.state
            .frontier
            .reprioritize_all(&self.state.stats, self.decay);

        if self.dry_streak >= self.config.crawler.stop_on_dry_spell {
            tracing::warn!(
                "Stopping due to dry streak of {} collections without new files",
                self.dry_streak
            );
            return Ok(Some(CrawlOutcome::DryStreakStopped));
        }

        Ok(None)
    }

    /// Pages through a collection, harvesting each unseen item
    ///
    /// Returns the number of new files emitted, or `None` when the first page
    /// could not be fetched. A later failed page ends the traversal early and
    /// what was found so far counts.
    async fn traverse_collection(
        &mut self,
        collection: &str,
        depth: u32,
    ) -> Result<Option<u64>, SpiderError> {
        let mut new_files = 0;
        let mut pages = 1;
        let mut page = 1;

        while page <= pages {
            let listing = match self.search.fetch_page(collection, page).await {
                Ok(listing) => listing,
                Err(e) if page == 1 => {
                    tracing::warn!("Search failed for {}: {}", collection, e);
                    return Ok(None);
                }
                Err(e) => {
                    tracing::warn!("Search page {} failed for {}: {}", page, collection, e);
                    break;
                }
            };

            if page == 1 {
                pages = total_pages(listing.num_found, self.search.rows());
                tracing::debug!(
                    "Collection {}: numFound={}, pages={}",
                    collection,
                    listing.num_found,
                    pages
                );
            }
            tracing::debug!("{} page {} docs={}", collection, page, listing.docs.len());

            for doc in listing.docs {
                if !self.state.visited.insert_item(&doc.identifier) {
                    continue;
                }
                self.state.stats.record(collection, 1, 0);

                if let Some(record) = self.resolver.fetch_record(&doc.identifier).await {
                    new_files += self.emit_files(&doc.identifier, &doc.title, &record)?;
                    self.discover_parents(&record, depth);
                }
                self.publish_progress();
            }

            page += 1;
        }

        Ok(Some(new_files))
    }

    /// Visits a single item node
    ///
    /// The item's owning collection is unknown here, so no statistics are
    /// attributed.
    async fn visit_identifier(&mut self, node: &FrontierNode) -> Result<(), SpiderError> {
        let identifier = node.value.as_str();

        if !self.state.visited.insert_item(identifier) {
            tracing::debug!("Skip seen identifier {}", identifier);
            return Ok(());
        }
        self.visits += 1;
        tracing::info!(
            "[I] Visiting identifier '{}' (depth={}) | visits={}/{}",
            identifier,
            node.depth,
            self.visits,
            self.config.crawler.max_visits
        );

        let Some(record) = self.resolver.fetch_record(identifier).await else {
            tracing::debug!("No metadata for {}", identifier);
            return Ok(());
        };

        let title = record.title();
        self.emit_files(identifier, &title, &record)?;
        self.discover_parents(&record, node.depth);
        Ok(())
    }

    /// Writes every not-yet-emitted disk image of a record to the sink
    fn emit_files(
        &mut self,
        identifier: &str,
        title: &str,
        record: &ItemRecord,
    ) -> Result<u64, SpiderError> {
        let mut emitted = 0;

        for file in self.resolver.extract_files(identifier, title, record) {
            if !self.state.visited.insert_file(&file.identifier, &file.file_name) {
                continue;
            }
            self.sink.emit(&file)?;
            tracing::debug!("Found {}", file.download_url);
            self.total_files += 1;
            emitted += 1;
        }

        Ok(emitted)
    }

    /// Queues the record's unvisited parent collections one level deeper
    fn discover_parents(&mut self, record: &ItemRecord, depth: u32) {
        for parent in extract_parent_collections(record) {
            if self.state.visited.contains_collection(&parent) {
                continue;
            }
            let priority = self.state.stats.ratio(&parent);
            tracing::debug!(
                "Queue collection {} (priority={:.3}, depth={})",
                parent,
                priority,
                depth + 1
            );
            self.state
                .frontier
                .push(FrontierNode::collection(parent, priority, depth + 1));
        }
    }

    fn publish_progress(&self) {
        self.status.update_progress(
            self.visits,
            self.total_files,
            self.state.frontier.len(),
            self.state.visited.item_count(),
            self.state.visited.collection_count(),
        );
    }
}
