// src/models/mod.rs

//! Domain models for the lead harvester.
//!
//! Plain data only: leads, usage counters, statistics, and configuration.

mod config;
mod lead;
mod quota;
mod selectors;
mod stats;

// Re-export all public types
pub use config::{Config, CrawlerConfig, DirectoryConfig, QuotaConfig, StorageConfig};
pub use lead::Lead;
pub use quota::{QuotaCheck, QuotaState, Remaining};
pub use selectors::{CardSelectors, DetailSelectors, ListingStrategy, SelectorConfig};
pub use stats::Stats;
