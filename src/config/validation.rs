use crate::config::types::{CrawlConfig, SiteConfig, SiteTable};
use crate::ConfigError;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Longest politeness delay accepted on the command line
const MAX_DELAY: Duration = Duration::from_secs(3600);

/// Validates the whole site table
pub fn validate_site_table(table: &SiteTable) -> Result<(), ConfigError> {
    if table.sites.is_empty() {
        return Err(ConfigError::Validation(
            "site table cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in &table.sites {
        validate_site(site)?;
        if !seen.insert(site.code.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site code '{}'",
                site.code
            )));
        }
    }

    Ok(())
}

/// Validates a single site entry
pub fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    validate_code(&site.code)?;

    let url = Url::parse(&site.home_page).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid home page '{}': {}", site.home_page, e))
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "Home page '{}' must use HTTP(S)",
            site.home_page
        )));
    }

    for (name, value) in [
        ("special-keyword", &site.special_keyword),
        ("category-keyword", &site.category_keyword),
        ("steps-label", &site.steps_label),
        ("method-word", &site.method_word),
        ("steps-intro", &site.steps_intro),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty for site '{}'",
                name, site.code
            )));
        }
    }

    Ok(())
}

/// Locale codes are short lowercase ASCII tokens
fn validate_code(code: &str) -> Result<(), ConfigError> {
    if code.is_empty() || code.len() > 8 {
        return Err(ConfigError::Validation(format!(
            "site code must be 1 to 8 characters, got '{}'",
            code
        )));
    }

    if !code.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ConfigError::Validation(format!(
            "site code must be lowercase ASCII letters, got '{}'",
            code
        )));
    }

    Ok(())
}

/// Validates the settings of a crawl run
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one language is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in &config.sites {
        if !seen.insert(site.code.as_str()) {
            return Err(ConfigError::Validation(format!(
                "language '{}' requested more than once",
                site.code
            )));
        }
    }

    if config.out_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.delay > MAX_DELAY {
        return Err(ConfigError::Validation(format!(
            "delay must be at most {}s, got {}s",
            MAX_DELAY.as_secs(),
            config.delay.as_secs()
        )));
    }

    Ok(())
}
