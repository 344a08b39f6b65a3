//! Item metadata resolution
//!
//! This module fetches item records from the metadata endpoint and extracts
//! what the crawl needs from them: the node kind of a seed, the disk-image
//! files an item carries, and the collections it belongs to.

use crate::config::{CrawlerConfig, EndpointConfig};
use crate::crawler::fetcher::HttpClient;
use crate::output::DiscoveredFile;
use crate::state::NodeKind;
use crate::SpiderError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeSet;
use url::Url;

/// One entry of a record's `files` list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileEntry {
    /// Usually a string; numbers and lists are tolerated, other shapes read as absent
    #[serde(default)]
    pub name: Option<Value>,

    /// Usually a decimal string, occasionally a number
    #[serde(default)]
    pub size: Option<Value>,
}

/// The descriptive part of a record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub mediatype: Option<Value>,

    #[serde(default)]
    pub title: Option<Value>,

    /// Parent collections: absent, a single string, or a list
    #[serde(default)]
    pub collection: Option<Value>,
}

impl FileEntry {
    /// Trimmed, non-empty file name
    pub fn name(&self) -> Option<String> {
        let name = self.name.as_ref().and_then(first_string)?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// A parsed item record
///
/// `null` in place of `files` or `metadata` reads as empty, and `files`
/// entries that are not objects are dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemRecord {
    #[serde(default, deserialize_with = "lenient_files")]
    pub files: Vec<FileEntry>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ItemMetadata,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_files<'de, D>(deserializer: D) -> Result<Vec<FileEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => entries,
        _ => return Ok(Vec::new()),
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

impl ItemRecord {
    /// Title from the metadata block, or an empty string
    pub fn title(&self) -> String {
        self.metadata
            .title
            .as_ref()
            .and_then(first_string)
            .unwrap_or_default()
    }

    /// Lower-cased mediatype, or an empty string
    pub fn mediatype(&self) -> String {
        self.metadata
            .mediatype
            .as_ref()
            .and_then(first_string)
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Reads a string out of a value that may also be a list of strings
fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fetches records and turns them into files and collection references
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    http: HttpClient,
    metadata_url: String,
    download_base: Url,
    extensions: Vec<String>,
}

impl MetadataResolver {
    /// Creates a resolver against the configured endpoints
    ///
    /// # Arguments
    ///
    /// * `http` - Shared HTTP client
    /// * `endpoints` - Metadata endpoint and download base
    /// * `crawler` - Supplies the recognized file extensions
    pub fn new(
        http: HttpClient,
        endpoints: &EndpointConfig,
        crawler: &CrawlerConfig,
    ) -> Result<Self, SpiderError> {
        let download_base = Url::parse(&endpoints.download_base).map_err(|e| {
            crate::ConfigError::InvalidUrl(format!(
                "Invalid download_base '{}': {}",
                endpoints.download_base, e
            ))
        })?;

        Ok(Self {
            http,
            metadata_url: endpoints.metadata_url.trim_end_matches('/').to_string(),
            download_base,
            extensions: crawler
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        })
    }

    /// Decides whether a seed is a collection or a single item
    ///
    /// Anything that cannot be resolved is treated as a collection: an item
    /// searched as a collection just yields no pages, while a collection
    /// treated as an item would lose its whole subtree.
    pub async fn classify(&self, seed: &str) -> NodeKind {
        match self.fetch_record(seed).await {
            Some(record) if record.mediatype() != "collection" => NodeKind::Identifier,
            _ => NodeKind::Collection,
        }
    }

    /// Fetches an item record
    ///
    /// Returns `None` for any failure: non-200 status, transport error,
    /// unparseable body, or the empty object the service returns for
    /// unknown identifiers.
    pub async fn fetch_record(&self, identifier: &str) -> Option<ItemRecord> {
        let url = format!("{}/{}", self.metadata_url, identifier);

        let response = match self.http.get(&url, &[]).await {
            Ok(response) if response.status == 200 => response,
            Ok(response) => {
                tracing::debug!("Metadata for {} returned HTTP {}", identifier, response.status);
                return None;
            }
            Err(e) => {
                tracing::debug!("Metadata fetch failed for {}: {}", identifier, e);
                return None;
            }
        };

        let value: Value = match response.json() {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Metadata for {} unusable: {}", identifier, e);
                return None;
            }
        };

        if value.as_object().map_or(true, |obj| obj.is_empty()) {
            tracing::debug!("Metadata for {} is empty", identifier);
            return None;
        }

        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Metadata for {} has unexpected shape: {}", identifier, e);
                None
            }
        }
    }

    /// Returns true if the file name ends in a recognized disk-image extension
    pub fn is_disk_image(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    /// Builds `{download_base}/{identifier}/{file_name}`
    ///
    /// Each path component is percent-encoded; slashes inside the file name
    /// still separate components.
    pub fn download_url(&self, identifier: &str, file_name: &str) -> String {
        let mut url = self.download_base.clone();
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(identifier);
                segments.extend(file_name.split('/'));
            }
            Err(()) => {
                return format!(
                    "{}/{}/{}",
                    self.download_base.as_str().trim_end_matches('/'),
                    identifier,
                    file_name
                );
            }
        }
        url.to_string()
    }

    /// Lists the disk-image files of a record
    pub fn extract_files(
        &self,
        identifier: &str,
        title: &str,
        record: &ItemRecord,
    ) -> Vec<DiscoveredFile> {
        record
            .files
            .iter()
            .filter_map(|entry| {
                let name = entry.name()?;
                if !self.is_disk_image(&name) {
                    return None;
                }

                let size = entry
                    .size
                    .as_ref()
                    .and_then(first_string)
                    .unwrap_or_else(|| "unknown".to_string());

                Some(DiscoveredFile {
                    identifier: identifier.to_string(),
                    title: title.to_string(),
                    download_url: self.download_url(identifier, &name),
                    file_name: name,
                    size,
                })
            })
            .collect()
    }
}

/// Collections the record declares membership in
///
/// The field may be absent, a single value, or a list. Strings and numbers
/// are accepted the same way in either form; empty and other entries are
/// dropped.
pub fn extract_parent_collections(record: &ItemRecord) -> BTreeSet<String> {
    let values: &[Value] = match record.metadata.collection.as_ref() {
        Some(Value::Array(items)) => items,
        Some(single) => std::slice::from_ref(single),
        None => &[],
    };

    values
        .iter()
        .filter_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}
