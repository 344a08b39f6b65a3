//! Shared crawl progress snapshot
//!
//! Written by the crawl loop and the HTTP client, read by the heartbeat.
//! Counters are relaxed atomics and the last-request record is only replaced
//! when its lock is free, so writers never wait. Readers may see values from
//! slightly different moments.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Phase of the crawl state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    Seeding,
    Looping,
    Draining,
    Finished,
}

impl CrawlPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Seeding,
            1 => Self::Looping,
            2 => Self::Draining,
            _ => Self::Finished,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Seeding => 0,
            Self::Looping => 1,
            Self::Draining => 2,
            Self::Finished => 3,
        }
    }
}

impl std::fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seeding => write!(f, "seeding"),
            Self::Looping => write!(f, "looping"),
            Self::Draining => write!(f, "draining"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Timing and outcome of one HTTP attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRecord {
    pub url: String,
    pub status: Option<u16>,
    pub round_trip_secs: f64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Point-in-time copy of [`CrawlStatus`]
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub elapsed: Duration,
    pub phase: CrawlPhase,
    pub visits: u64,
    pub max_visits: u64,
    pub total_files: u64,
    pub frontier_size: u64,
    pub visited_items: u64,
    pub visited_collections: u64,
    pub requests: u64,
    pub retries: u64,
    pub running: bool,
    pub last_request: Option<RequestRecord>,
}

/// Progress counters shared between the crawl loop and the heartbeat
#[derive(Debug)]
pub struct CrawlStatus {
    started_at: DateTime<Utc>,
    started: Instant,
    max_visits: u64,
    phase: AtomicU8,
    visits: AtomicU64,
    total_files: AtomicU64,
    frontier_size: AtomicU64,
    visited_items: AtomicU64,
    visited_collections: AtomicU64,
    requests: AtomicU64,
    retries: AtomicU64,
    running: AtomicBool,
    last_request: RwLock<Option<RequestRecord>>,
}

impl CrawlStatus {
    /// Creates a status for a run capped at `max_visits`; it starts out running
    pub fn new(max_visits: u64) -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            max_visits,
            phase: AtomicU8::new(CrawlPhase::Seeding.as_u8()),
            visits: AtomicU64::new(0),
            total_files: AtomicU64::new(0),
            frontier_size: AtomicU64::new(0),
            visited_items: AtomicU64::new(0),
            visited_collections: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            running: AtomicBool::new(true),
            last_request: RwLock::new(None),
        }
    }

    pub fn set_phase(&self, phase: CrawlPhase) {
        self.phase.store(phase.as_u8(), Ordering::Relaxed);
    }

    pub fn phase(&self) -> CrawlPhase {
        CrawlPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    /// Publishes the crawl loop's counters
    pub fn update_progress(
        &self,
        visits: u64,
        total_files: u64,
        frontier_size: usize,
        visited_items: usize,
        visited_collections: usize,
    ) {
        self.visits.store(visits, Ordering::Relaxed);
        self.total_files.store(total_files, Ordering::Relaxed);
        self.frontier_size
            .store(frontier_size as u64, Ordering::Relaxed);
        self.visited_items
            .store(visited_items as u64, Ordering::Relaxed);
        self.visited_collections
            .store(visited_collections as u64, Ordering::Relaxed);
    }

    /// Records one HTTP attempt
    ///
    /// The record is dropped when a reader currently holds the lock or the
    /// lock is poisoned; counters are always updated.
    pub fn record_request(&self, record: RequestRecord, is_retry: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if is_retry {
            self.retries.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut slot) = self.last_request.try_write() {
            *slot = Some(record);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signals the end of the crawl loop
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<RequestRecord> {
        self.last_request
            .try_read()
            .ok()
            .and_then(|slot| slot.clone())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
            phase: self.phase(),
            visits: self.visits.load(Ordering::Relaxed),
            max_visits: self.max_visits,
            total_files: self.total_files.load(Ordering::Relaxed),
            frontier_size: self.frontier_size.load(Ordering::Relaxed),
            visited_items: self.visited_items.load(Ordering::Relaxed),
            visited_collections: self.visited_collections.load(Ordering::Relaxed),
            requests: self.requests(),
            retries: self.retries(),
            running: self.is_running(),
            last_request: self.last_request(),
        }
    }
}
