// src/utils/http.rs

//! HTTP client utilities and the fetch proxy.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::{normalize_url, utf8_prefix};

/// Retrieves the raw text of a web page on behalf of the crawler.
///
/// Implementations enforce their own timeout and bound the response size.
#[async_trait]
pub trait FetchProxy: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch proxy backed by `reqwest`.
#[derive(Clone)]
pub struct HttpFetchProxy {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetchProxy {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl FetchProxy for HttpFetchProxy {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let url = normalize_url(url);
        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::fetch(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(&url, format!("HTTP {}", status.as_u16())));
        }

        // Stop reading once the cap is reached.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| AppError::fetch(&url, e))? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                log::debug!("Body of {} cut at {} bytes", url, self.max_body_bytes);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(utf8_prefix(body))
    }
}
