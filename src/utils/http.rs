// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Source of page markup.
///
/// Implemented over `reqwest` for real runs and by in-memory fakes in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the response body as text.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(
            config.list_timeout_secs.max(config.detail_timeout_secs),
        ))
        .build()?;
    Ok(client)
}

/// `PageFetcher` backed by a `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        ensure_success(url, response.status())?;
        Ok(response.text().await?)
    }
}

/// Reject non-2xx responses, naming the URL that produced them.
fn ensure_success(url: &str, status: reqwest::StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AppError::fetch(url, format!("HTTP {status}")))
    }
}

/// Join `path` onto `base` and append query-encoded `params` in order.
pub fn build_url(base: &str, path: &str, params: &[(String, String)]) -> Result<Url> {
    let mut url = Url::parse(base)?.join(path)?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url)
}
