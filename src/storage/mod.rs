//! Storage module for persisting crawl progress and output
//!
//! This module handles every file the crawler writes:
//! - The URL catalog (`urls.jsonl`), the single checkpoint of remaining work
//! - Per-(language, category) shard files of extracted articles
//! - Per-(language, category) failure logs
//!
//! A single crawler process is assumed per output directory. Two processes
//! writing the same catalog would overwrite each other's progress.

mod catalog;
mod shard;

pub use catalog::UrlCatalog;
pub use shard::{
    failure_log_path, read_shard_urls, shard_file_name, shard_path, FailureLog, ShardWriter,
    FAILURE_DIR, SHARD_PREFIX,
};

use crate::HarvestError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File name of the catalog inside the output directory
pub const CATALOG_FILE: &str = "urls.jsonl";

/// One discovered article address and its processing status
///
/// Field order matches the catalog file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub lang: String,
    pub category: String,
    pub page: usize,
    pub is_processed: bool,
    pub url: String,
}

impl CatalogEntry {
    /// Creates an unprocessed entry with a fresh id
    pub fn new(lang: &str, category: &str, page: usize, url: &str) -> Result<Self, HarvestError> {
        let entry = Self {
            id: Uuid::new_v4().to_string(),
            lang: lang.to_string(),
            category: category.to_string(),
            page,
            is_processed: false,
            url: url.to_string(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Checks the field-level invariants of an entry
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.id.is_empty() {
            return Err(HarvestError::Catalog("entry id cannot be empty".to_string()));
        }
        if self.lang.is_empty() || self.category.is_empty() {
            return Err(HarvestError::Catalog(format!(
                "entry {} needs a language and a category",
                self.url
            )));
        }
        if self.url.is_empty() {
            return Err(HarvestError::Catalog(format!(
                "entry {} has an empty url",
                self.id
            )));
        }
        if self.page == 0 {
            return Err(HarvestError::Catalog(format!(
                "entry {} has page 0, pages start at 1",
                self.url
            )));
        }
        Ok(())
    }
}
