use serde::Deserialize;
use std::time::Duration;

/// Seeds used when neither the config file nor the CLI names any
pub const DEFAULT_SEEDS: &[&str] = &[
    "ubuntu_releases",
    "vintagesoftware",
    "linuxtracker",
    "archlinux_archive",
    "Fedora_Project",
    "debian-cd",
];

/// Main configuration structure for the spider
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed collection or item identifiers
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub endpoints: EndpointConfig,
    pub heartbeat: HeartbeatConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            crawler: CrawlerConfig::default(),
            http: HttpConfig::default(),
            endpoints: EndpointConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Crawl loop limits and prioritization knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of frontier pops that count as visits
    pub max_visits: u64,

    /// Collections deeper than this are skipped
    pub max_depth: u32,

    /// Rows per search page
    pub rows: u32,

    /// Minimum time between consecutive requests (milliseconds)
    pub request_delay_ms: u64,

    /// Stop after this many consecutive collections yield no new files
    pub stop_on_dry_spell: u32,

    /// Multiplier applied to unconfirmed collections on every re-weigh
    pub priority_decay: f64,

    /// Lowest priority an unconfirmed collection can decay to
    pub priority_floor: f64,

    /// Recognized disk-image file extensions, matched case-insensitively
    pub extensions: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_visits: 200,
            max_depth: 4,
            rows: 500,
            request_delay_ms: 750,
            stop_on_dry_spell: 25,
            priority_decay: 0.95,
            priority_floor: 0.1,
            extensions: vec![".iso".to_string(), ".img".to_string()],
        }
    }
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// HTTP client behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Retry budget for transient failures
    pub retries: u32,

    /// Exponential backoff factor (seconds)
    pub backoff_factor: f64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 5,
            backoff_factor: 1.0,
            user_agent: "IA-Iso-Spider/1.0 (+https://archive.org)".to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Remote service endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EndpointConfig {
    /// Paginated advanced-search endpoint
    pub search_url: String,

    /// Per-identifier metadata endpoint (the identifier is appended as a path segment)
    pub metadata_url: String,

    /// Base of the download URL template
    pub download_base: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            search_url: "https://archive.org/advancedsearch.php".to_string(),
            metadata_url: "https://archive.org/metadata".to_string(),
            download_base: "https://archive.org/download".to_string(),
        }
    }
}

/// Heartbeat reporter settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HeartbeatConfig {
    /// Seconds between progress lines (never less than two)
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_secs: 15 }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the JSONL stream of discovered files
    pub results_path: String,

    /// Path to the per-collection yield statistics JSON
    pub stats_path: String,

    /// Optional log file mirrored from the console output
    pub log_file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: "iso_spider_results.jsonl".to_string(),
            stats_path: "iso_spider_stats.json".to_string(),
            log_file: Some("iso_spider.log".to_string()),
        }
    }
}
