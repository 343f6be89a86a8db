//! HTTP fetching shared by the processing pipeline and the archiver.
//!
//! One [`Client`] is built per job from a [`FetchConfig`]. It keeps a cookie
//! jar, so pages that set a session cookie on first load serve their
//! subresources correctly.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::uri::parse_http_url;
use crate::{Result, ShelfmarkError};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("Shelfmark/", env!("CARGO_PKG_VERSION"), " (+https://github.com/shelfmark/shelfmark)");

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    pub user_agent: String,
    /// Skip TLS certificate verification. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 20, user_agent: USER_AGENT.to_string(), accept_invalid_certs: false }
    }
}

impl FetchConfig {
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }
}

/// Builder for [`FetchConfig`].
#[derive(Debug, Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout = seconds;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> FetchConfig {
        self.config
    }
}

/// A downloaded body with the content-type it was served as.
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    /// Final URL after redirects.
    pub url: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_html(&self) -> bool {
        is_html(&self.content_type)
    }
}

/// Whether a content-type header denotes an HTML document.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

/// Builds a cookie-enabled client.
///
/// # Errors
///
/// Returns [`ShelfmarkError::HttpError`] if the TLS backend cannot be initialised.
pub fn build_client(config: &FetchConfig) -> Result<Client> {
    let client = Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout))
        .user_agent(&config.user_agent)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?;
    Ok(client)
}

/// Downloads `url`, failing on non-success statuses.
///
/// `timeout` overrides the client's default for this request.
///
/// # Errors
///
/// * [`ShelfmarkError::InvalidUrl`] unless `url` is http(s) with a host
/// * [`ShelfmarkError::Timeout`] when the request exceeds `timeout`
/// * [`ShelfmarkError::FetchFailed`] for error statuses
/// * [`ShelfmarkError::HttpError`] for connection, DNS and TLS failures
pub async fn fetch_url(client: &Client, url: &str, timeout: u64) -> Result<Fetched> {
    let parsed = parse_http_url(url)?;

    let response = client
        .get(parsed)
        .timeout(Duration::from_secs(timeout))
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .send()
        .await
        .map_err(|e| classify(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ShelfmarkError::FetchFailed(format!("{url}: HTTP {status}")));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.bytes().await.map_err(|e| classify(e, timeout))?.to_vec();

    Ok(Fetched { url: final_url, content_type, body })
}

fn classify(err: reqwest::Error, timeout: u64) -> ShelfmarkError {
    if err.is_timeout() { ShelfmarkError::Timeout { timeout } } else { ShelfmarkError::HttpError(err) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 20);
        assert!(config.user_agent.starts_with("Shelfmark/"));
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_fetch_config_builder() {
        let config = FetchConfig::builder().timeout(5).user_agent("test-agent").accept_invalid_certs(true).build();
        assert_eq!(config.timeout, 5);
        assert_eq!(config.user_agent, "test-agent");
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("TEXT/HTML"));
        assert!(!is_html("application/pdf"));
        assert!(!is_html(""));
    }

    #[tokio::test]
    async fn test_fetch_url_invalid() {
        let client = build_client(&FetchConfig::default()).unwrap();
        let result = fetch_url(&client, "not-a-url", 5).await;
        assert!(matches!(result, Err(ShelfmarkError::InvalidUrl(_))));

        let result = fetch_url(&client, "ftp://ex.com/file", 5).await;
        assert!(matches!(result, Err(ShelfmarkError::InvalidUrl(_))));
    }
}
