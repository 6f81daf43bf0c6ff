//! Application configuration structures.

use std::fs;
use std::path::Path;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::SelectorConfig;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Website crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Freemium limits
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Hosting directory and social platform domains
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Persistent storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Selector cascades for cards and the detail view
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_body_bytes == 0 {
            return Err(AppError::validation("crawler.max_body_bytes must be > 0"));
        }
        if self.quota.free_daily_limit == 0 {
            return Err(AppError::validation("quota.free_daily_limit must be > 0"));
        }
        if self.directory.host_domain.trim().is_empty() {
            return Err(AppError::validation("directory.host_domain is empty"));
        }
        if self.selectors.cards.strategies.is_empty() {
            return Err(AppError::validation("selectors.cards.strategies is empty"));
        }
        for selector in self.selectors.all() {
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        Ok(())
    }
}

/// Website crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout enforced by the fetch proxy
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between website visits in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Response bodies are truncated to this many characters
    #[serde(default = "defaults::max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_body_bytes: defaults::max_body_bytes(),
        }
    }
}

/// Freemium limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Leads a free user may commit per calendar day
    #[serde(default = "defaults::free_daily_limit")]
    pub free_daily_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_daily_limit: defaults::free_daily_limit(),
        }
    }
}

/// Directory and social platform domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Links back to this domain are never taken as a business website
    #[serde(default = "defaults::host_domain")]
    pub host_domain: String,

    /// Domains whose links are collected as social profiles
    #[serde(default = "defaults::social_domains")]
    pub social_domains: Vec<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host_domain: defaults::host_domain(),
            social_domains: defaults::social_domains(),
        }
    }
}

/// Persistent storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Upper bound for the serialized store; writes beyond it fail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        1500
    }
    pub fn max_body_bytes() -> usize {
        500_000
    }
    pub fn free_daily_limit() -> u32 {
        25
    }
    pub fn host_domain() -> String {
        "google.com".into()
    }
    pub fn social_domains() -> Vec<String> {
        [
            "facebook.com",
            "instagram.com",
            "twitter.com",
            "x.com",
            "linkedin.com",
            "youtube.com",
            "tiktok.com",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let mut config = Config::default();
        config.quota.free_daily_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.selectors.detail.panel = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            request_delay_ms = 0

            [quota]
            free_daily_limit = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.request_delay_ms, 0);
        assert_eq!(config.crawler.timeout_secs, 10);
        assert_eq!(config.quota.free_daily_limit, 5);
        assert_eq!(config.directory.host_domain, "google.com");
    }
}
