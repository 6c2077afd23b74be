//! HTTP fetcher implementation
//!
//! A thin wrapper over a shared `reqwest::Client`. Every failure (connection,
//! timeout, non-2xx status, undecodable body) becomes a
//! `HarvestError::Transport`; retries are not attempted here.

use crate::config::HttpConfig;
use crate::HarvestError;
use reqwest::Client;

/// Builds an HTTP client from the HTTP settings
///
/// # Example
///
/// ```
/// use howto_harvest::config::HttpConfig;
/// use howto_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests and returns response bodies
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(config).map_err(|e| HarvestError::Transport {
            url: String::new(),
            message: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns its body as text
    pub async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Transport {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| transport_error(url, &e))
    }
}

/// Classifies a reqwest error into a transport failure message
fn transport_error(url: &str, error: &reqwest::Error) -> HarvestError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    HarvestError::Transport {
        url: url.to_string(),
        message,
    }
}
