//! Periodic liveness reporting
//!
//! The heartbeat runs as its own tokio task and only ever reads the shared
//! [`CrawlStatus`]. A tick that panics is swallowed so the reporter keeps
//! going, and nothing it does can stall the crawl loop.

use crate::state::{CrawlStatus, StatusSnapshot};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest interval the heartbeat will tick at
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Derived progress figures for one heartbeat line
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatLine {
    pub elapsed: Duration,
    pub visits: u64,
    pub max_visits: u64,
    pub total_files: u64,
    pub frontier_size: u64,
    pub visits_per_min: f64,
    pub files_per_min: f64,
    /// `None` when the visit rate is zero or the visit budget is used up
    pub eta: Option<Duration>,
    pub last_request: Option<String>,
}

impl HeartbeatLine {
    /// Derives rates and the ETA from a status snapshot
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        let secs = snapshot.elapsed.as_secs_f64();
        let per_min = |count: u64| {
            if secs > 0.0 {
                count as f64 * 60.0 / secs
            } else {
                0.0
            }
        };

        let visits_per_min = per_min(snapshot.visits);
        let remaining = snapshot.max_visits.saturating_sub(snapshot.visits);
        let eta = if visits_per_min > 0.0 && remaining > 0 {
            Duration::try_from_secs_f64(remaining as f64 * 60.0 / visits_per_min).ok()
        } else {
            None
        };

        let last_request = snapshot.last_request.as_ref().map(|req| {
            let status = req
                .status
                .map_or_else(|| "ERR".to_string(), |code| code.to_string());
            format!("{} {} ({:.2}s)", status, req.url, req.round_trip_secs)
        });

        Self {
            elapsed: snapshot.elapsed,
            visits: snapshot.visits,
            max_visits: snapshot.max_visits,
            total_files: snapshot.total_files,
            frontier_size: snapshot.frontier_size,
            visits_per_min,
            files_per_min: per_min(snapshot.total_files),
            eta,
            last_request,
        }
    }
}

impl std::fmt::Display for HeartbeatLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let eta = self.eta.map_or_else(|| "--".to_string(), format_hms);
        write!(
            f,
            "elapsed={} visits={}/{} files={} frontier={} rate={:.1} visits/min {:.1} files/min eta={}",
            format_hms(self.elapsed),
            self.visits,
            self.max_visits,
            self.total_files,
            self.frontier_size,
            self.visits_per_min,
            self.files_per_min,
            eta
        )?;
        if let Some(last) = &self.last_request {
            write!(f, " last={}", last)?;
        }
        Ok(())
    }
}

/// Formats a duration as `HH:MM:SS`
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Handle to a running heartbeat task
pub struct Heartbeat {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawns the reporter; `interval` is raised to [`MIN_HEARTBEAT_INTERVAL`] if shorter
    pub fn spawn(status: Arc<CrawlStatus>, interval: Duration) -> Self {
        let period = interval.max(MIN_HEARTBEAT_INTERVAL);
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !status.is_running() {
                            break;
                        }
                        let report = catch_unwind(AssertUnwindSafe(|| {
                            HeartbeatLine::from_snapshot(&status.snapshot())
                        }));
                        match report {
                            Ok(line) => tracing::info!("[HB] {}", line),
                            Err(_) => tracing::debug!("Heartbeat tick failed; skipping"),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
            tracing::debug!("Heartbeat stopped");
        });

        Self { shutdown, handle }
    }

    /// Stops the reporter and waits for its task to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::debug!("Heartbeat task ended abnormally: {}", e);
        }
    }
}
