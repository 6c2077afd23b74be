//! Output module for everything produced after the crawl loop
//!
//! This module handles:
//! - Run summaries and catalog statistics
//! - Merging shards into one shuffled corpus per language
//! - The question/answer dataset view over a merged corpus

pub mod dataset;
pub mod merge;
pub mod stats;

pub use dataset::{
    builder_configs, export, format_methods, BuilderConfig, Dataset, DatasetExample, DatasetInfo,
    Examples, ALL_CONFIG, SPANISH_CATEGORIES,
};
pub use merge::{coerce_refs, find_shards, merge_shards, CorpusRecord, MergeOptions, MergeReport};
pub use stats::{
    format_elapsed, load_catalog_statistics, print_run_summary, print_catalog_statistics,
    CatalogStatistics, GroupProgress, RunSummary,
};
