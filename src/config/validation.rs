use crate::config::types::{
    Config, CrawlerConfig, EndpointConfig, HeartbeatConfig, HttpConfig, OutputConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seeds(&config.seeds)?;
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_endpoints(&config.endpoints)?;
    validate_heartbeat_config(&config.heartbeat)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the seed identifiers
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed identifier is required".to_string(),
        ));
    }

    for seed in seeds {
        if seed.is_empty() || seed.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "seed '{}' must be a non-empty identifier without whitespace",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates crawl limits and priority constants
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_visits < 1 {
        return Err(ConfigError::Validation(
            "max_visits must be >= 1, got 0".to_string(),
        ));
    }

    if config.rows < 1 || config.rows > 10_000 {
        return Err(ConfigError::Validation(format!(
            "rows must be between 1 and 10000, got {}",
            config.rows
        )));
    }

    if config.stop_on_dry_spell < 1 {
        return Err(ConfigError::Validation(
            "stop_on_dry_spell must be >= 1, got 0".to_string(),
        ));
    }

    if !(config.priority_decay > 0.0 && config.priority_decay <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "priority_decay must be in (0, 1], got {}",
            config.priority_decay
        )));
    }

    if !(0.0..=1.0).contains(&config.priority_floor) {
        return Err(ConfigError::Validation(format!(
            "priority_floor must be in [0, 1], got {}",
            config.priority_floor
        )));
    }

    if config.extensions.is_empty() {
        return Err(ConfigError::Validation(
            "at least one file extension is required".to_string(),
        ));
    }

    for ext in &config.extensions {
        if ext.len() < 2 || !ext.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "extension '{}' must start with '.' followed by a suffix",
                ext
            )));
        }
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1, got 0".to_string(),
        ));
    }

    if config.retries > 20 {
        return Err(ConfigError::Validation(format!(
            "retries must be <= 20, got {}",
            config.retries
        )));
    }

    if !config.backoff_factor.is_finite() || config.backoff_factor < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be a finite number >= 0, got {}",
            config.backoff_factor
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the remote endpoints
fn validate_endpoints(config: &EndpointConfig) -> Result<(), ConfigError> {
    validate_http_url("search_url", &config.search_url)?;
    validate_http_url("metadata_url", &config.metadata_url)?;
    validate_http_url("download_base", &config.download_base)?;
    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

fn validate_heartbeat_config(config: &HeartbeatConfig) -> Result<(), ConfigError> {
    if config.interval_secs < 1 {
        return Err(ConfigError::Validation(
            "heartbeat interval_secs must be >= 1, got 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_path.is_empty() {
        return Err(ConfigError::Validation(
            "results_path cannot be empty".to_string(),
        ));
    }

    if config.stats_path.is_empty() {
        return Err(ConfigError::Validation(
            "stats_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.log_file.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "log_file cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_seeds_rejected() {
        let mut config = Config::default();
        config.seeds.clear();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_seed_with_whitespace_rejected() {
        let mut config = Config::default();
        config.seeds = vec!["two words".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_max_visits_rejected() {
        let mut config = Config::default();
        config.crawler.max_visits = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rows_out_of_range() {
        let mut config = Config::default();
        config.crawler.rows = 20_000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_priority_constants_checked() {
        let mut config = Config::default();
        config.crawler.priority_decay = 1.5;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.priority_floor = -0.1;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.priority_decay = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_extension_without_dot_rejected() {
        let mut config = Config::default();
        config.crawler.extensions = vec!["iso".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_negative_backoff_rejected() {
        let mut config = Config::default();
        config.http.backoff_factor = -1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_delay_and_backoff_allowed() {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        config.http.backoff_factor = 0.0;
        config.http.retries = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = Config::default();
        config.endpoints.metadata_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        let mut config = Config::default();
        config.endpoints.search_url = "ftp://archive.org/search".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_output_paths_rejected() {
        let mut config = Config::default();
        config.output.stats_path.clear();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.output.log_file = Some(String::new());
        assert!(validate(&config).is_err());
    }
}
