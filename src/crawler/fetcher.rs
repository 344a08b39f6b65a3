//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the reqwest client with the configured user agent and timeout
//! - Pacing consecutive requests by a fixed delay
//! - Retrying idempotent requests with exponential backoff
//! - Recording every attempt into the shared crawl status
//! - Error classification (transient vs permanent)

use crate::config::{CrawlerConfig, HttpConfig};
use crate::state::{CrawlStatus, RequestRecord};
use crate::SpiderError;
use chrono::Utc;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Longest single backoff sleep
const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Statuses worth another attempt
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub retries: u32,

    /// Seconds; retry `n` sleeps `backoff_factor * 2^(n-1)`
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry.saturating_sub(1).min(30) as i32);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(BACKOFF_MAX)
            .min(BACKOFF_MAX)
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status.as_u16())
    }
}

/// Enforces a minimum gap between consecutive requests
#[derive(Debug)]
struct Pacer {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until the delay since the previous request has passed, then claims the slot
    async fn wait_turn(&self) {
        let wait = {
            let mut last = self
                .last_request
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let ready_at = last.map_or(now, |prev| (prev + self.delay).max(now));
            *last = Some(ready_at);
            ready_at - now
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// A successful response with its body already read
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

impl HttpResponse {
    /// Parses the body as JSON; a malformed body is a protocol error
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SpiderError> {
        serde_json::from_str(&self.body).map_err(|e| SpiderError::Protocol {
            url: self.url.clone(),
            message: format!("invalid JSON body: {}", e),
        })
    }
}

/// Outcome of one attempt, before the retry decision
enum Attempt {
    Done(HttpResponse),
    Retryable {
        message: String,
        retry_after: Option<Duration>,
    },
    Fatal(SpiderError),
}

/// Sequential HTTP client with retry, pacing and status capture
///
/// Cloning is cheap; clones share the connection pool, the pacing slot and
/// the status record.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
    timeout: Duration,
    pacer: Arc<Pacer>,
    status: Option<Arc<CrawlStatus>>,
}

/// Builds the underlying reqwest client
///
/// # Arguments
///
/// * `config` - HTTP settings (user agent and timeout)
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(config.timeout().min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

impl HttpClient {
    /// Creates a client from the HTTP and crawler settings
    ///
    /// # Arguments
    ///
    /// * `http` - Timeout, retry budget, backoff and user agent
    /// * `crawler` - Supplies the inter-request delay
    /// * `status` - Where attempts are recorded, if anywhere
    pub fn new(
        http: &HttpConfig,
        crawler: &CrawlerConfig,
        status: Option<Arc<CrawlStatus>>,
    ) -> Result<Self, SpiderError> {
        Ok(Self {
            client: build_http_client(http)?,
            policy: RetryPolicy {
                retries: http.retries,
                backoff_factor: http.backoff_factor,
            },
            timeout: http.timeout(),
            pacer: Arc::new(Pacer::new(crawler.request_delay())),
            status,
        })
    }

    /// GET with query parameters
    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<HttpResponse, SpiderError> {
        self.execute(Method::GET, url, params).await
    }

    /// Executes a request, retrying transient failures of idempotent methods
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return the response |
    /// | 429, 500, 502, 503, 504 | Retry with backoff (honours Retry-After) |
    /// | Timeout / connect / body read failure | Retry with backoff |
    /// | Any other status | Fail immediately with `SpiderError::Status` |
    ///
    /// Only GET and HEAD are retried. When the budget runs out the last
    /// failure is returned as `SpiderError::Transient`.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<HttpResponse, SpiderError> {
        let idempotent = method == Method::GET || method == Method::HEAD;
        let max_attempts = if idempotent {
            self.policy.retries + 1
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.pacer.wait_turn().await;

            match self.attempt(&method, url, params, attempt).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::Fatal(error) => return Err(error),
                Attempt::Retryable {
                    message,
                    retry_after,
                } => {
                    if attempt >= max_attempts {
                        return Err(SpiderError::Transient {
                            url: url.to_string(),
                            attempts: attempt,
                            message,
                        });
                    }

                    let mut delay = self.policy.backoff(attempt);
                    if let Some(retry_after) = retry_after {
                        delay = delay.max(retry_after.min(BACKOFF_MAX));
                    }
                    tracing::debug!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after transient failure: {}",
                        message
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        params: &[(&str, String)],
        attempt: u32,
    ) -> Attempt {
        let started_at = Utc::now();
        let started = Instant::now();

        let sent = self
            .client
            .request(method.clone(), url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await;

        let (outcome, status) = match sent {
            Ok(response) => {
                let status = response.status();
                let retry_after = parse_retry_after(&response);

                let attempt_outcome = if status.is_success() {
                    match response.text().await {
                        Ok(body) => Attempt::Done(HttpResponse {
                            url: url.to_string(),
                            status: status.as_u16(),
                            body,
                            attempts: attempt,
                        }),
                        Err(e) => Attempt::Retryable {
                            message: format!("failed to read body: {}", e),
                            retry_after: None,
                        },
                    }
                } else if RetryPolicy::is_retryable_status(status) {
                    Attempt::Retryable {
                        message: format!("HTTP {}", status.as_u16()),
                        retry_after,
                    }
                } else {
                    Attempt::Fatal(SpiderError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    })
                };
                (attempt_outcome, Some(status.as_u16()))
            }
            Err(e) => {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                (
                    Attempt::Retryable {
                        message,
                        retry_after: None,
                    },
                    None,
                )
            }
        };

        self.record(url, status, &outcome, started_at, started, attempt);
        outcome
    }

    fn record(
        &self,
        url: &str,
        status: Option<u16>,
        outcome: &Attempt,
        started_at: chrono::DateTime<Utc>,
        started: Instant,
        attempt: u32,
    ) {
        let Some(crawl_status) = self.status.as_ref() else {
            return;
        };

        let error = match outcome {
            Attempt::Done(_) => None,
            Attempt::Retryable { message, .. } => Some(message.clone()),
            Attempt::Fatal(e) => Some(e.to_string()),
        };

        crawl_status.record_request(
            RequestRecord {
                url: url.to_string(),
                status,
                round_trip_secs: started.elapsed().as_secs_f64(),
                error,
                started_at,
                finished_at: Utc::now(),
            },
            attempt > 1,
        );
    }
}

/// Reads a delay-seconds `Retry-After` header (HTTP-date values are ignored)
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
