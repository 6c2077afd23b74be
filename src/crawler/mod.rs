//! Crawler module for page fetching and article extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching
//! - Category, pagination and article extraction
//! - The resumable discovery/processing loop

mod article;
mod coordinator;
mod fetcher;
mod parser;

pub use article::{ArticleRecord, Method};
pub use coordinator::{run_crawl, Coordinator, CrawlPhase};
pub use fetcher::{build_http_client, Fetcher};
pub use parser::{
    article_id_from_api, count_pages, extract_article, list_article_urls, list_categories,
};

use crate::config::SiteConfig;
use crate::HarvestError;

/// Looks up the numeric page id of an article through the site's MediaWiki API
///
/// # Arguments
///
/// * `fetcher` - The fetcher to issue the API request with
/// * `site` - The site the article belongs to
/// * `url` - The article address
pub async fn lookup_article_id(
    fetcher: &Fetcher,
    site: &SiteConfig,
    url: &str,
) -> Result<u64, HarvestError> {
    let api_url = site.page_info_url(url)?;
    let body = fetcher.fetch(api_url.as_str()).await?;
    article_id_from_api(&body, url)
}
