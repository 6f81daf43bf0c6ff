// src/services/crawl.rs

//! Crawl orchestrator.
//!
//! Visits the website of every lead that has one but no email yet, one site
//! at a time, and keeps the best contact address found on each page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::models::CrawlerConfig;
use crate::services::fields::extract_emails;
use crate::services::store::LeadStore;
use crate::utils::http::FetchProxy;

/// Local parts that usually belong to a shared business inbox.
const CONTACT_PREFIXES: &[&str] = &[
    "info@",
    "contact@",
    "hello@",
    "support@",
    "sales@",
    "admin@",
    "help@",
    "office@",
    "mail@",
    "enquiries@",
    "inquiries@",
    "general@",
];

/// Pages with this many emails or fewer keep all of them as candidates.
const SMALL_PAGE_EMAILS: usize = 2;

/// Summary of one crawl batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Leads eligible for a visit when the batch started
    pub targets: usize,
    /// Fetches attempted
    pub processed: usize,
    /// Leads that received an email
    pub emails_found: usize,
    /// Fetches that failed
    pub failures: usize,
    /// Whether the batch stopped early
    pub cancelled: bool,
}

/// Pick the contact candidates among the emails found on a page.
///
/// Small pages keep everything. Otherwise well-known inbox prefixes win,
/// falling back to the first two addresses.
pub fn select_contact_emails(emails: &[String]) -> Vec<String> {
    if emails.len() <= SMALL_PAGE_EMAILS {
        return emails.to_vec();
    }
    let contacts: Vec<String> = emails
        .iter()
        .filter(|email| {
            let lower = email.to_lowercase();
            CONTACT_PREFIXES.iter().any(|p| lower.starts_with(p))
        })
        .cloned()
        .collect();
    if contacts.is_empty() {
        emails.iter().take(SMALL_PAGE_EMAILS).cloned().collect()
    } else {
        contacts
    }
}

/// Sequential email crawler with a fixed pause between sites.
#[derive(Debug, Clone)]
pub struct EmailCrawler {
    delay: Duration,
}

impl EmailCrawler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(Duration::from_millis(config.request_delay_ms))
    }

    /// Visit every crawl target in discovery order.
    ///
    /// `cancel` is polled before each visit; a fetch already in flight runs
    /// to completion. A failing site is logged and skipped.
    pub async fn run(
        &self,
        store: &mut LeadStore,
        proxy: &dyn FetchProxy,
        cancel: &AtomicBool,
    ) -> CrawlReport {
        let targets = store.crawl_targets();
        let mut report = CrawlReport {
            targets: targets.len(),
            ..CrawlReport::default()
        };
        if targets.is_empty() {
            log::info!("No websites to visit");
            return report;
        }

        log::info!("Visiting {} website(s) for emails", targets.len());
        for (idx, name) in targets.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                log::info!("Crawl cancelled after {} of {}", idx, targets.len());
                report.cancelled = true;
                break;
            }

            let Some(website) = store.get(name).map(|lead| lead.website.clone()) else {
                continue;
            };
            report.processed += 1;
            log::info!("[{}/{}] {}", idx + 1, targets.len(), website);

            match proxy.fetch_page(&website).await {
                Ok(text) => {
                    let emails = extract_emails(Some(&text));
                    let candidates = select_contact_emails(&emails);
                    if let (Some(email), Some(lead)) = (candidates.first(), store.get_mut(name)) {
                        log::debug!("Found {} for {}", email, name);
                        lead.email.clone_from(email);
                        report.emails_found += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to scan {}: {}", website, e);
                    report.failures += 1;
                }
            }

            if idx + 1 < targets.len() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        log::info!(
            "Crawl finished: {}/{} visited, {} email(s), {} failure(s)",
            report.processed,
            report.targets,
            report.emails_found,
            report.failures
        );
        report
    }
}
