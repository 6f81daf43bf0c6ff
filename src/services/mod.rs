//! Service layer for the lead harvester.
//!
//! This module contains the business logic for:
//! - Field extraction from text and elements (`fields`)
//! - Lead construction from cards and the detail panel (`RecordBuilder`)
//! - Deduplication and merging (`LeadStore`)
//! - Daily usage limits (`QuotaTracker`)
//! - Website email enrichment (`EmailCrawler`)
//! - CSV export (`export`)

pub mod crawl;
pub mod export;
pub mod fields;
pub mod quota;
pub mod records;
pub mod store;

pub use crawl::{CrawlReport, EmailCrawler};
pub use quota::{Activation, QuotaTracker};
pub use records::RecordBuilder;
pub use store::{LeadStore, Upsert};
