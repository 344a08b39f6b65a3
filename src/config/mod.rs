//! Configuration module for the ISO spider
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every table and key is optional; anything left out falls back to the
//! defaults the spider ships with.
//!
//! # Example
//!
//! ```no_run
//! use iso_spider::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Crawler will visit at most {} nodes", config.crawler.max_visits);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, EndpointConfig, HeartbeatConfig, HttpConfig, OutputConfig,
    DEFAULT_SEEDS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, read_config};
pub use validation::validate;
