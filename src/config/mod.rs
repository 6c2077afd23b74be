//! Configuration module for the harvester
//!
//! This module holds the immutable per-locale site table (compiled in from
//! `sites.toml`) and the settings of a crawl run built from the command line.
//!
//! # Example
//!
//! ```
//! use howto_harvest::config::SiteTable;
//!
//! let table = SiteTable::builtin().unwrap();
//! let es = table.get("es").unwrap();
//! assert_eq!(es.category_listing_url(), "https://es.wikihow.com/Especial:CategoryListing");
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CrawlConfig, HttpConfig, SiteConfig, SiteTable};

pub use validation::{validate_crawl_config, validate_site};
