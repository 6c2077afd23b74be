//! Crawl coordinator - discovery and processing loop
//!
//! The coordinator owns the URL catalog for the duration of a run:
//! - Discovers categories, pages and article URLs when no catalog exists
//! - Recovers articles already written to a shard but not yet checkpointed
//! - Fetches and extracts every unprocessed article, one at a time
//! - Appends results to shards and checkpoints the catalog after each success
//!
//! Article-level failures (transport or extraction) are logged and skipped.
//! Any other error stops the run, since continuing would break the checkpoint.

use crate::config::{validate_crawl_config, CrawlConfig, SiteConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{count_pages, extract_article, list_article_urls, list_categories};
use crate::crawler::ArticleRecord;
use crate::output::RunSummary;
use crate::storage::{
    read_shard_urls, shard_path, CatalogEntry, FailureLog, ShardWriter, UrlCatalog,
};
use crate::HarvestError;
use std::fmt;
use std::fs;
use std::time::Instant;

/// Stage of the crawl for one (language, category) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    DiscoveringCategories,
    DiscoveringPages,
    DiscoveringUrls,
    Processing,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DiscoveringCategories => "discovering categories",
            Self::DiscoveringPages => "discovering pages",
            Self::DiscoveringUrls => "discovering urls",
            Self::Processing => "processing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: CrawlConfig,
    fetcher: Fetcher,
    catalog: UrlCatalog,
    catalog_existed: bool,
}

impl Coordinator {
    /// Creates a coordinator, loading the catalog when one exists
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration, unreadable catalog, or
    ///   output directory that cannot be created
    pub fn new(config: CrawlConfig) -> Result<Self, HarvestError> {
        validate_crawl_config(&config)?;
        fs::create_dir_all(&config.out_dir)?;

        let catalog_path = config.catalog_path();
        let catalog_existed = catalog_path.is_file();
        let catalog = if catalog_existed {
            let catalog = UrlCatalog::load(&catalog_path)?;
            tracing::info!(
                "Resuming from catalog {} ({} of {} processed)",
                catalog_path.display(),
                catalog.processed_count(),
                catalog.len()
            );
            catalog
        } else {
            UrlCatalog::new(catalog_path)
        };

        let fetcher = Fetcher::new(&config.http)?;

        Ok(Self {
            config,
            fetcher,
            catalog,
            catalog_existed,
        })
    }

    /// Runs discovery (if needed) and one full processing pass
    pub async fn run(&mut self) -> Result<RunSummary, HarvestError> {
        let start_time = Instant::now();
        let mut summary = RunSummary::default();

        if !self.catalog_existed || self.config.rediscover {
            summary.discovered = self.discover().await?;
        } else {
            tracing::info!("Catalog exists, skipping discovery");
        }

        summary.recovered = self.reconcile()?;
        self.process(&mut summary).await?;

        summary.processed_total = self.catalog.processed_count();
        summary.unprocessed_total = self.catalog.len() - summary.processed_total;
        summary.elapsed = start_time.elapsed();
        Ok(summary)
    }

    /// Walks every requested site and registers the article URLs it lists
    ///
    /// The catalog is persisted once, after all sites are walked, so an
    /// interrupted discovery leaves no catalog behind and is simply redone.
    async fn discover(&mut self) -> Result<usize, HarvestError> {
        let sites = self.config.sites.clone();
        let before = self.catalog.len();

        for site in &sites {
            self.discover_site(site).await?;
        }

        self.catalog.persist()?;
        let added = self.catalog.len() - before;
        tracing::info!(
            "Stored {} new URLs in {}",
            added,
            self.catalog.path().display()
        );
        Ok(added)
    }

    async fn discover_site(&mut self, site: &SiteConfig) -> Result<(), HarvestError> {
        tracing::info!("[{}] {}", site.code, CrawlPhase::DiscoveringCategories);
        let listing_url = site.category_listing_url();
        let listing = self.fetcher.fetch(&listing_url).await?;
        let categories = list_categories(&listing, &listing_url)?;
        tracing::info!("[{}] Found {} categories", site.code, categories.len());

        let base_url = site.base_url()?;
        for category in &categories {
            tracing::debug!("[{}/{}] {}", site.code, category, CrawlPhase::DiscoveringPages);
            let first_page = self
                .fetcher
                .fetch(&site.category_url(category, None))
                .await?;
            let num_pages = count_pages(&first_page);

            tracing::debug!(
                "[{}/{}] {} across {} pages",
                site.code,
                category,
                CrawlPhase::DiscoveringUrls,
                num_pages
            );
            for page in 1..=num_pages {
                let html = self
                    .fetcher
                    .fetch(&site.category_url(category, Some(page)))
                    .await?;
                for url in list_article_urls(&html, &base_url)? {
                    self.catalog
                        .record_discovery(&site.code, category, page, &url)?;
                }
            }
        }

        Ok(())
    }

    /// Marks entries whose record already sits in their shard as processed
    ///
    /// Covers a crash between the shard append and the catalog persist: the
    /// article is not fetched a second time and no duplicate is written.
    fn reconcile(&mut self) -> Result<usize, HarvestError> {
        let mut recovered = 0;

        for (lang, category) in self.catalog.groups() {
            let pending: Vec<(String, String)> = self
                .catalog
                .unprocessed(Some(&lang), Some(&category))
                .into_iter()
                .map(|e| (e.id.clone(), e.url.clone()))
                .collect();
            if pending.is_empty() {
                continue;
            }

            let written = read_shard_urls(&shard_path(&self.config.out_dir, &lang, &category))?;
            for (id, url) in pending {
                if written.contains(&url) {
                    tracing::warn!("Recovered {} from its shard without refetching", url);
                    self.catalog.mark_processed(&id)?;
                    recovered += 1;
                }
            }
        }

        if recovered > 0 {
            self.catalog.persist()?;
        }
        Ok(recovered)
    }

    /// Processes unprocessed entries of the requested languages, group by group
    async fn process(&mut self, summary: &mut RunSummary) -> Result<(), HarvestError> {
        let groups: Vec<(SiteConfig, String)> = self
            .catalog
            .groups()
            .into_iter()
            .filter_map(|(lang, category)| {
                self.config.site(&lang).cloned().map(|site| (site, category))
            })
            .collect();

        let total = groups.len();
        for (index, (site, category)) in groups.iter().enumerate() {
            let pending: Vec<CatalogEntry> = self
                .catalog
                .unprocessed(Some(&site.code), Some(category))
                .into_iter()
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }

            tracing::info!(
                "Processing category {}/{}.{} from WIKI-HOW-{}...",
                index + 1,
                total,
                category,
                site.code.to_uppercase()
            );
            self.process_group(site, category, &pending, summary).await?;
            tracing::debug!("[{}/{}] {}", site.code, category, CrawlPhase::Done);
        }

        Ok(())
    }

    async fn process_group(
        &mut self,
        site: &SiteConfig,
        category: &str,
        pending: &[CatalogEntry],
        summary: &mut RunSummary,
    ) -> Result<(), HarvestError> {
        let out_dir = self.config.out_dir.clone();
        let cap = self.config.category_cap();
        let mut shard = ShardWriter::open(&out_dir, &site.code, category)?;
        let mut failure_log: Option<FailureLog> = None;
        let mut successes = 0;

        for (index, entry) in pending.iter().enumerate() {
            if cap.map_or(false, |cap| successes >= cap) {
                tracing::info!(
                    "Reached {} articles for {}, moving on",
                    successes,
                    category
                );
                break;
            }

            tokio::time::sleep(self.config.delay).await;

            match self.process_entry(site, entry).await {
                Ok(record) => {
                    shard.append(&record)?;
                    self.catalog.mark_processed(&entry.id)?;
                    self.catalog.persist()?;

                    successes += 1;
                    summary.record_success(&site.code, category);
                    tracing::info!(
                        "\t{}/{}) Processed: [{}] {}",
                        index + 1,
                        pending.len(),
                        entry.id,
                        record.title()
                    );
                }
                Err(e) if e.is_item_failure() => {
                    tracing::warn!(
                        "\t{}/{}) Error: Could not process {}: {}",
                        index + 1,
                        pending.len(),
                        entry.url,
                        e
                    );
                    if failure_log.is_none() {
                        failure_log = Some(FailureLog::open(&out_dir, &site.code, category)?);
                    }
                    if let Some(log) = failure_log.as_mut() {
                        log.record(category, &entry.url)?;
                    }
                    summary.record_failure(&site.code, category);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    async fn process_entry(
        &self,
        site: &SiteConfig,
        entry: &CatalogEntry,
    ) -> Result<ArticleRecord, HarvestError> {
        let html = self.fetcher.fetch(&entry.url).await?;
        extract_article(&html, &entry.url, site)
    }
}

/// Runs a complete crawl with the given settings
///
/// # Example
///
/// ```no_run
/// use howto_harvest::config::{CrawlConfig, HttpConfig, SiteTable};
/// use howto_harvest::crawler::run_crawl;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let table = SiteTable::builtin()?;
/// let config = CrawlConfig {
///     sites: table.select(&["es"])?,
///     out_dir: "./output".into(),
///     max_per_category: 50,
///     delay: Duration::from_secs(5),
///     rediscover: false,
///     http: HttpConfig::default(),
/// };
/// let summary = run_crawl(config).await?;
/// println!("{} articles", summary.total_successes());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: CrawlConfig) -> Result<RunSummary, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
