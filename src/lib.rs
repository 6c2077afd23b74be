//! howto-harvest: a resumable tutorial-site harvester
//!
//! This crate crawls the localized WikiHow sites, extracts each article into a
//! structured record, checkpoints progress in a line-delimited URL catalog and
//! merges the per-category shards into one corpus per language.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Network failure, timeout or non-2xx status while fetching a page
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The page did not have the shape the extractor expects
    #[error("Extraction error for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Catalog entry not found: {0}")]
    NotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("No shard files for language '{lang}' in {}", dir.display())]
    NoShards { lang: String, dir: PathBuf },

    #[error("Shard files for language '{lang}' in {} hold no readable records", dir.display())]
    NoRecords { lang: String, dir: PathBuf },

    #[error("Refusing to overwrite existing file {} (pass --force)", .0.display())]
    OutputExists(PathBuf),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for the per-article failures the crawler records and skips.
    ///
    /// Everything else (filesystem, catalog consistency, configuration) must
    /// stop the run.
    pub fn is_item_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Extraction { .. })
    }

    pub(crate) fn extraction(url: &str, message: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse site table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{CrawlConfig, SiteConfig, SiteTable};
pub use crawler::{ArticleRecord, Method};
pub use storage::{CatalogEntry, UrlCatalog};
