//! Collection listing through the paginated advanced-search endpoint

use crate::config::{CrawlerConfig, EndpointConfig};
use crate::crawler::fetcher::HttpClient;
use crate::SpiderError;
use serde::Deserialize;
use serde_json::Value;

/// Fields requested for every listed item
const SEARCH_FIELDS: [&str; 4] = ["identifier", "title", "collection", "creator"];

/// Search response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub response: SearchResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "numFound", default)]
    pub num_found: u64,

    #[serde(default)]
    pub docs: Vec<Value>,
}

/// One listed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDoc {
    pub identifier: String,
    pub title: String,
}

/// One page of a collection listing
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub page: u32,
    pub num_found: u64,
    pub docs: Vec<SearchDoc>,
}

/// Number of pages needed for `num_found` results; at least one
pub fn total_pages(num_found: u64, rows: u32) -> u32 {
    let rows = u64::from(rows.max(1));
    let pages = num_found.div_ceil(rows).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Reads a doc field that may be a string or a list of strings
fn doc_string(doc: &Value, field: &str) -> String {
    match doc.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .find_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Pages through a collection's items
#[derive(Debug, Clone)]
pub struct CollectionSearch {
    http: HttpClient,
    search_url: String,
    rows: u32,
}

impl CollectionSearch {
    pub fn new(http: HttpClient, endpoints: &EndpointConfig, crawler: &CrawlerConfig) -> Self {
        Self {
            http,
            search_url: endpoints.search_url.clone(),
            rows: crawler.rows,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Fetches one page (1-based) of a collection listing
    ///
    /// Docs without an identifier are dropped.
    pub async fn fetch_page(&self, collection: &str, page: u32) -> Result<SearchPage, SpiderError> {
        let mut params: Vec<(&str, String)> = vec![("q", format!("collection:{}", collection))];
        params.extend(SEARCH_FIELDS.iter().map(|field| ("fl[]", field.to_string())));
        params.push(("rows", self.rows.to_string()));
        params.push(("page", page.to_string()));
        params.push(("output", "json".to_string()));

        let response = self.http.get(&self.search_url, &params).await?;
        if response.status != 200 {
            return Err(SpiderError::Status {
                url: response.url,
                status: response.status,
            });
        }

        let envelope: SearchEnvelope = response.json()?;
        let docs = envelope
            .response
            .docs
            .iter()
            .filter_map(|doc| {
                let identifier = doc_string(doc, "identifier");
                if identifier.is_empty() {
                    return None;
                }
                Some(SearchDoc {
                    identifier,
                    title: doc_string(doc, "title"),
                })
            })
            .collect();

        Ok(SearchPage {
            page,
            num_found: envelope.response.num_found,
            docs,
        })
    }
}
