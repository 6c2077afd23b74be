//! Run summaries and catalog statistics
//!
//! This module provides the end-of-run summary of a crawl and the progress
//! statistics that can be read back from a catalog at any time.

use crate::storage::UrlCatalog;
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome of one crawl run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Successful articles per language, then per category
    pub successes: BTreeMap<String, BTreeMap<String, usize>>,

    /// Failed articles per language, then per category
    pub failures: BTreeMap<String, BTreeMap<String, usize>>,

    /// URLs added to the catalog by discovery
    pub discovered: usize,

    /// Entries marked processed from existing shard contents
    pub recovered: usize,

    /// Processed entries in the whole catalog after the run
    pub processed_total: usize,

    /// Unprocessed entries in the whole catalog after the run
    pub unprocessed_total: usize,

    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record_success(&mut self, lang: &str, category: &str) {
        *self
            .successes
            .entry(lang.to_string())
            .or_default()
            .entry(category.to_string())
            .or_default() += 1;
    }

    pub fn record_failure(&mut self, lang: &str, category: &str) {
        *self
            .failures
            .entry(lang.to_string())
            .or_default()
            .entry(category.to_string())
            .or_default() += 1;
    }

    pub fn total_successes(&self) -> usize {
        self.successes.values().flat_map(|c| c.values()).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.failures.values().flat_map(|c| c.values()).sum()
    }
}

/// Formats a duration the way `H:MM:SS` clocks read
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().round() as u64;
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Prints a run summary to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    if summary.discovered > 0 {
        println!("Discovered URLs: {}", summary.discovered);
    }
    if summary.recovered > 0 {
        println!("Recovered from shards: {}", summary.recovered);
    }

    println!("Successes:");
    if summary.successes.is_empty() {
        println!("  (none)");
    }
    for (lang, categories) in &summary.successes {
        let lang_total: usize = categories.values().sum();
        println!("  {} ({}):", lang, lang_total);
        for (category, count) in categories {
            println!("    {}: {}", category, count);
        }
    }
    println!();

    println!("Num failures:    {}", summary.total_failures());
    println!("Num successes:   {}", summary.total_successes());
    println!("Num processed:   {}", summary.processed_total);
    println!("Num unprocessed: {}", summary.unprocessed_total);
    println!("Total runtime:   {}", format_elapsed(summary.elapsed));
}

/// Progress of one (language, category) group in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupProgress {
    pub lang: String,
    pub category: String,
    pub processed: usize,
    pub total: usize,
}

/// Catalog-wide progress statistics
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    pub total: usize,
    pub processed: usize,
    pub groups: Vec<GroupProgress>,
}

/// Computes progress statistics from a catalog, groups in discovery order
pub fn load_catalog_statistics(catalog: &UrlCatalog) -> CatalogStatistics {
    let mut groups: Vec<GroupProgress> = catalog
        .groups()
        .into_iter()
        .map(|(lang, category)| GroupProgress {
            lang,
            category,
            processed: 0,
            total: 0,
        })
        .collect();

    for entry in catalog.entries() {
        if let Some(group) = groups
            .iter_mut()
            .find(|g| g.lang == entry.lang && g.category == entry.category)
        {
            group.total += 1;
            if entry.is_processed {
                group.processed += 1;
            }
        }
    }

    CatalogStatistics {
        total: catalog.len(),
        processed: catalog.processed_count(),
        groups,
    }
}

/// Prints catalog statistics to stdout
pub fn print_catalog_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total URLs: {}", stats.total);
    println!("  Processed: {}", stats.processed);
    println!("  Remaining: {}", stats.total - stats.processed);
    println!();

    println!("By Category:");
    for group in &stats.groups {
        println!(
            "  [{}] {}: {} / {}",
            group.lang, group.category, group.processed, group.total
        );
    }
    println!();

    let rate = if stats.total > 0 {
        (stats.processed as f64 / stats.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Completion: {:.1}% ({} / {} articles processed)",
        rate, stats.processed, stats.total
    );
}
