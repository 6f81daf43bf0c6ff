// src/session.rs

//! Scraping session.
//!
//! A [`Session`] owns the lead collection, the quota tracker and the crawl
//! cancellation flag for one page. Every user-facing action goes through it
//! and ends in a [`Status`]: errors are logged and reported, never returned,
//! and the in-memory leads survive a failed write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dom::DocumentAdapter;
use crate::error::{AppError, Result};
use crate::host::HostChannel;
use crate::models::{Config, Lead, QuotaCheck, Stats};
use crate::services::export;
use crate::services::quota::Clock;
use crate::services::{
    Activation, CrawlReport, EmailCrawler, LeadStore, QuotaTracker, RecordBuilder,
};
use crate::storage::{self, KeyValueStore};
use crate::utils::http::FetchProxy;

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// User-visible outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

/// Result of scraping the visible result cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeReport {
    /// New leads committed
    pub added: usize,
    /// Known leads refreshed with new fields
    pub merged: usize,
    /// Whether the daily limit stopped (part of) the batch
    pub limit_reached: bool,
    pub status: Status,
}

impl ScrapeReport {
    fn stopped(status: Status, limit_reached: bool) -> Self {
        Self {
            added: 0,
            merged: 0,
            limit_reached,
            status,
        }
    }
}

/// Result of scraping the detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailReport {
    /// The lead as stored after the merge
    pub lead: Option<Lead>,
    pub is_new: bool,
    pub status: Status,
}

impl DetailReport {
    fn stopped(status: Status) -> Self {
        Self {
            lead: None,
            is_new: false,
            status,
        }
    }
}

/// Result of visiting lead websites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitReport {
    pub crawl: CrawlReport,
    pub status: Status,
}

/// Rendered CSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub file_name: String,
    pub csv: Option<String>,
    pub status: Status,
}

/// Collected email addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailList {
    pub emails: Vec<String>,
    pub status: Status,
}

/// Handle that stops a running website visit before its next site.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State and actions of one scraping session.
pub struct Session {
    storage: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn FetchProxy>,
    host: Option<HostChannel>,
    builder: RecordBuilder,
    crawler: EmailCrawler,
    store: LeadStore,
    quota: QuotaTracker,
    cancel: Arc<AtomicBool>,
}

impl Session {
    /// Open a session over persisted leads and counters.
    pub async fn open(
        config: &Config,
        storage: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn FetchProxy>,
    ) -> Result<Self> {
        let leads = storage::load_leads(storage.as_ref()).await?;
        let quota = QuotaTracker::load(storage.as_ref(), config.quota.free_daily_limit).await?;
        log::debug!("Session opened with {} stored lead(s)", leads.len());

        Ok(Self {
            storage,
            fetcher,
            host: None,
            builder: RecordBuilder::from_config(config),
            crawler: EmailCrawler::from_config(&config.crawler),
            store: LeadStore::from_leads(leads),
            quota,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Report committed leads to a background service.
    pub fn with_host(mut self, host: HostChannel) -> Self {
        self.host = Some(host);
        self
    }

    /// Replace the calendar-day source of the quota tracker.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.quota = self.quota.with_clock(clock);
        self
    }

    pub fn leads(&self) -> &[Lead] {
        self.store.leads()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    /// Current counters, computed from the session's own state.
    pub fn stats(&self) -> Stats {
        let quota = self.quota.state();
        Stats {
            daily_count: quota.count_on(self.quota.today()),
            lifetime: quota.lifetime_count,
            is_premium: quota.is_premium,
            ..Stats::default()
        }
        .with_leads(self.store.leads())
    }

    /// Scrape all visible result cards into the collection.
    ///
    /// Known names are merged for free. New names are cut to the remaining
    /// daily allowance before they are committed and counted.
    pub async fn scrape_results<D: DocumentAdapter>(&mut self, doc: &D) -> ScrapeReport {
        let check = match self.gate().await {
            Ok(check) if check.allowed => check,
            Ok(_) => return ScrapeReport::stopped(self.limit_status(), true),
            Err(status) => return ScrapeReport::stopped(status, false),
        };

        let candidates = self.builder.scrape_cards(doc);
        if candidates.is_empty() {
            return ScrapeReport::stopped(
                Status::info("No new results found. Make sure you have search results visible."),
                false,
            );
        }

        let (known, fresh): (Vec<Lead>, Vec<Lead>) = candidates
            .into_iter()
            .partition(|lead| self.store.contains(&lead.name));
        let merged = known.len();
        for lead in known {
            self.store.upsert(lead);
        }

        let added = check.remaining.clamp(fresh.len());
        let limit_reached = added < fresh.len();
        for lead in fresh.into_iter().take(added) {
            self.store.upsert(lead);
        }
        log::info!("Scraped {added} new and {merged} known lead(s)");

        if let Err(e) = self.commit(added).await {
            return ScrapeReport {
                added,
                merged,
                limit_reached,
                status: storage_failure(e),
            };
        }
        self.notify_host(added).await;

        let status = if limit_reached {
            Status::info(format!(
                "Added {} leads. Daily limit reached ({} free).",
                added,
                self.quota.limit()
            ))
        } else if added > 0 {
            Status::success(format!("Found {added} new lead(s)!"))
        } else {
            Status::info(format!(
                "No new leads found. Refreshed {merged} existing lead(s)."
            ))
        };
        ScrapeReport {
            added,
            merged,
            limit_reached,
            status,
        }
    }

    /// Scrape the open detail panel into the collection.
    pub async fn scrape_detail<D: DocumentAdapter>(&mut self, doc: &D) -> DetailReport {
        match self.gate().await {
            Ok(check) if check.allowed => {}
            Ok(_) => return DetailReport::stopped(self.limit_status()),
            Err(status) => return DetailReport::stopped(status),
        }

        let Some(candidate) = self.builder.scrape_detail(doc) else {
            return DetailReport::stopped(Status::info(
                "No business detail panel open. Click a business first.",
            ));
        };

        let outcome = self.store.upsert(candidate);
        let is_new = outcome.is_new();
        let lead = outcome.lead().clone();

        let units = usize::from(is_new);
        if let Err(e) = self.commit(units).await {
            return DetailReport {
                lead: Some(lead),
                is_new,
                status: storage_failure(e),
            };
        }
        self.notify_host(units).await;

        let status = if is_new {
            Status::success(format!("Scraped \"{}\" from detail panel.", lead.name))
        } else {
            Status::success(format!("Updated details for \"{}\".", lead.name))
        };
        DetailReport {
            lead: Some(lead),
            is_new,
            status,
        }
    }

    /// Visit the website of every lead without an email.
    ///
    /// Gated by the same daily allowance as scraping, although it commits no
    /// new leads.
    pub async fn visit_websites(&mut self) -> VisitReport {
        match self.gate().await {
            Ok(check) if check.allowed => {}
            Ok(_) => {
                return VisitReport {
                    crawl: CrawlReport::default(),
                    status: self.limit_status(),
                };
            }
            Err(status) => {
                return VisitReport {
                    crawl: CrawlReport::default(),
                    status,
                };
            }
        }

        self.cancel.store(false, Ordering::SeqCst);
        let crawl = self
            .crawler
            .run(&mut self.store, self.fetcher.as_ref(), &self.cancel)
            .await;
        if crawl.targets == 0 {
            return VisitReport {
                crawl,
                status: Status::info("No websites to visit or all leads already have emails."),
            };
        }

        if let Err(e) = self.save_leads().await {
            return VisitReport {
                crawl,
                status: storage_failure(e),
            };
        }

        let status = if crawl.cancelled {
            Status::info(format!(
                "Stopped after {} of {} websites. Found {} email(s).",
                crawl.processed, crawl.targets, crawl.emails_found
            ))
        } else {
            Status::success(format!("Scanned {} websites for emails.", crawl.processed))
        };
        VisitReport { crawl, status }
    }

    /// Drop every lead. Usage counters are kept.
    pub async fn clear_all(&mut self) -> Status {
        self.store.clear();
        match self.save_leads().await {
            Ok(()) => Status::info("All leads cleared."),
            Err(e) => storage_failure(e),
        }
    }

    /// Render all leads as CSV.
    pub fn export_csv(&self) -> ExportReport {
        let file_name = export::default_file_name(self.quota.today());
        if self.store.is_empty() {
            return ExportReport {
                file_name,
                csv: None,
                status: Status::error("No leads to export."),
            };
        }
        match export::to_csv_string(self.store.leads()) {
            Ok(csv) => ExportReport {
                file_name,
                csv: Some(csv),
                status: Status::success(format!("Exported {} leads to CSV.", self.store.len())),
            },
            Err(e) => {
                log::error!("CSV export failed: {e}");
                ExportReport {
                    file_name,
                    csv: None,
                    status: Status::error(format!("Export failed: {e}")),
                }
            }
        }
    }

    /// Distinct emails across all leads.
    pub fn copy_emails(&self) -> EmailList {
        let emails = export::unique_emails(self.store.leads());
        let status = if emails.is_empty() {
            Status::info("No emails found yet. Try \"Visit Websites\" first.")
        } else {
            Status::success(format!("Copied {} email(s).", emails.len()))
        };
        EmailList { emails, status }
    }

    /// Unlock unlimited scraping with a license key.
    pub async fn activate_premium(&mut self, key: &str) -> Status {
        match self.quota.activate_premium(self.storage.as_ref(), key).await {
            Ok(Activation::Activated(_)) => {
                Status::success("Premium activated! Unlimited leads unlocked.")
            }
            Ok(Activation::TooShort) => Status::error("Please enter a valid license key."),
            Ok(Activation::InvalidFormat) => {
                Status::error("Invalid license key. Please try again.")
            }
            Err(e) => storage_failure(e),
        }
    }

    async fn gate(&mut self) -> std::result::Result<QuotaCheck, Status> {
        self.quota
            .check_allowed(self.storage.as_ref())
            .await
            .map_err(storage_failure)
    }

    fn limit_status(&self) -> Status {
        Status::info(format!(
            "Daily limit reached ({} free leads per day). Activate premium for unlimited leads.",
            self.quota.limit()
        ))
    }

    /// Count `new_leads` against the quota and persist the collection.
    async fn commit(&mut self, new_leads: usize) -> Result<()> {
        let units = u32::try_from(new_leads)
            .map_err(|_| AppError::validation(format!("batch too large: {new_leads}")))?;
        self.quota.increment(self.storage.as_ref(), units).await?;
        self.save_leads().await
    }

    async fn save_leads(&self) -> Result<()> {
        storage::save_leads(self.storage.as_ref(), self.store.leads()).await
    }

    async fn notify_host(&self, count: usize) {
        let Some(host) = &self.host else {
            return;
        };
        if count == 0 {
            return;
        }
        if let Err(e) = host.notify_scraped(count).await {
            log::warn!("Could not notify background service: {e}");
        }
    }
}

fn storage_failure(e: AppError) -> Status {
    log::error!("Storage failure: {e}");
    Status::error(format!("Could not save data: {e}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::dom::HtmlDocument;
    use crate::host::Background;
    use crate::storage::MemoryStorage;

    const RESULTS: &str = r#"
        <div role="feed">
          <div><div class="qBF1Pd">Acme Plumbing</div>
            <div class="W4Efsd">(555) 123-4567</div>
            <a href="https://acmeplumbing.example/">Website</a></div>
          <div><div class="qBF1Pd">Bravo Bakery</div>
            <a href="https://bravobakery.example/">Website</a></div>
          <div><div class="qBF1Pd">Charlie Cafe</div></div>
        </div>
    "#;

    const DETAIL: &str = r#"
        <div role="main">
          <h1 class="DUwDvf">Acme Plumbing</h1>
          <button data-item-id="address" aria-label="Address: 123 Main St"></button>
          <p>hello@acmeplumbing.example</p>
        </div>
    "#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    /// Serves canned pages and optionally cancels after the first fetch.
    #[derive(Default)]
    struct FakeSites {
        pages: HashMap<String, String>,
        cancel: Option<CancelHandle>,
    }

    #[async_trait]
    impl FetchProxy for FakeSites {
        async fn fetch_page(&self, url: &str) -> Result<String> {
            if let Some(cancel) = &self.cancel {
                cancel.cancel();
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::fetch(url, "HTTP 404"))
        }
    }

    fn config(limit: u32) -> Config {
        let mut config = Config::default();
        config.quota.free_daily_limit = limit;
        config.crawler.request_delay_ms = 0;
        config
    }

    async fn session(storage: Arc<MemoryStorage>, limit: u32) -> Session {
        Session::open(&config(limit), storage, Arc::new(FakeSites::default()))
            .await
            .unwrap()
            .with_clock(today)
    }

    #[tokio::test]
    async fn test_scrape_commits_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(Arc::clone(&storage), 25).await;
        let doc = HtmlDocument::parse(RESULTS);

        let report = session.scrape_results(&doc).await;
        assert_eq!(report.added, 3);
        assert!(!report.limit_reached);
        assert_eq!(report.status, Status::success("Found 3 new lead(s)!"));

        let persisted = storage::load_leads(storage.as_ref()).await.unwrap();
        assert_eq!(persisted.len(), 3);
        assert_eq!(session.stats().daily_count, 3);

        let again = session.scrape_results(&doc).await;
        assert_eq!(again.added, 0);
        assert_eq!(again.merged, 3);
        assert_eq!(session.leads().len(), 3);
        assert_eq!(session.stats().daily_count, 3);
    }

    #[tokio::test]
    async fn test_batch_cut_at_daily_limit() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(storage, 2).await;
        let doc = HtmlDocument::parse(RESULTS);

        let report = session.scrape_results(&doc).await;
        assert_eq!(report.added, 2);
        assert!(report.limit_reached);
        assert_eq!(
            report.status,
            Status::info("Added 2 leads. Daily limit reached (2 free).")
        );
        let names: Vec<_> = session.leads().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Plumbing", "Bravo Bakery"]);

        let gated = session.scrape_results(&doc).await;
        assert!(gated.limit_reached);
        assert_eq!(gated.added, 0);
        assert_eq!(session.leads().len(), 2);
        assert_eq!(session.stats().lifetime, 2);
    }

    #[tokio::test]
    async fn test_detail_insert_then_update() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(storage, 25).await;
        let doc = HtmlDocument::parse(DETAIL);

        let first = session.scrape_detail(&doc).await;
        assert!(first.is_new);
        assert_eq!(
            first.status.message,
            "Scraped \"Acme Plumbing\" from detail panel."
        );

        session.scrape_results(&HtmlDocument::parse(RESULTS)).await;
        let acme = &session.leads()[0];
        assert_eq!(acme.address, "123 Main St");
        assert_eq!(acme.phone, "(555) 123-4567");
        assert_eq!(acme.email, "hello@acmeplumbing.example");

        let second = session.scrape_detail(&doc).await;
        assert!(!second.is_new);
        assert_eq!(second.status.message, "Updated details for \"Acme Plumbing\".");
        assert_eq!(session.stats().daily_count, 3);
    }

    #[tokio::test]
    async fn test_missing_panel_is_informational() {
        let mut session = session(Arc::new(MemoryStorage::new()), 25).await;
        let report = session
            .scrape_detail(&HtmlDocument::parse("<p>search page</p>"))
            .await;
        assert!(report.lead.is_none());
        assert_eq!(report.status.kind, StatusKind::Info);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_leads_in_memory() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(Arc::clone(&storage), 25).await;
        session.gate().await.unwrap();
        storage.set_fail_writes(true);

        let report = session.scrape_results(&HtmlDocument::parse(RESULTS)).await;
        assert!(report.status.is_error());
        assert_eq!(session.leads().len(), 3);
        assert!(session.clear_all().await.is_error());
    }

    #[tokio::test]
    async fn test_visit_websites_fills_emails() {
        let storage = Arc::new(MemoryStorage::new());
        let sites = FakeSites {
            pages: HashMap::from([(
                "https://acmeplumbing.example/".to_string(),
                "jane@acme.io bob@acme.io info@acmeplumbing.example".to_string(),
            )]),
            cancel: None,
        };
        let mut session = Session::open(&config(25), storage.clone(), Arc::new(sites))
            .await
            .unwrap()
            .with_clock(today);
        session.scrape_results(&HtmlDocument::parse(RESULTS)).await;

        let report = session.visit_websites().await;
        assert_eq!(report.crawl.targets, 2);
        assert_eq!(report.crawl.processed, 2);
        assert_eq!(report.crawl.failures, 1);
        assert_eq!(report.status, Status::success("Scanned 2 websites for emails."));

        let persisted = storage::load_leads(storage.as_ref()).await.unwrap();
        assert_eq!(persisted[0].email, "info@acmeplumbing.example");

        let idle = session.visit_websites().await;
        assert_eq!(idle.crawl.targets, 1);
    }

    #[tokio::test]
    async fn test_visit_with_no_targets() {
        let mut session = session(Arc::new(MemoryStorage::new()), 25).await;
        let report = session.visit_websites().await;
        assert_eq!(
            report.status,
            Status::info("No websites to visit or all leads already have emails.")
        );
    }

    #[tokio::test]
    async fn test_cancel_handle_stops_visit() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(Arc::clone(&storage), 25).await;
        session.scrape_results(&HtmlDocument::parse(RESULTS)).await;

        let sites = FakeSites {
            pages: HashMap::new(),
            cancel: Some(session.cancel_handle()),
        };
        session.fetcher = Arc::new(sites);

        let report = session.visit_websites().await;
        assert!(report.crawl.cancelled);
        assert!(session.cancel_handle().is_cancelled());
        assert_eq!(report.crawl.processed, 1);
        assert_eq!(report.status.kind, StatusKind::Info);
    }

    #[tokio::test]
    async fn test_export_and_emails() {
        let mut session = session(Arc::new(MemoryStorage::new()), 25).await;
        let empty = session.export_csv();
        assert!(empty.csv.is_none());
        assert_eq!(empty.status, Status::error("No leads to export."));
        assert_eq!(session.copy_emails().status.kind, StatusKind::Info);

        session.scrape_detail(&HtmlDocument::parse(DETAIL)).await;
        let export = session.export_csv();
        assert_eq!(export.file_name, "leadharvest-2026-06-01.csv");
        assert!(export.csv.unwrap().starts_with("Business Name,"));
        assert_eq!(
            session.copy_emails().emails,
            vec!["hello@acmeplumbing.example"]
        );
    }

    #[tokio::test]
    async fn test_activate_premium_lifts_limit() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(Arc::clone(&storage), 1).await;

        assert_eq!(
            session.activate_premium("abc").await,
            Status::error("Please enter a valid license key.")
        );
        assert_eq!(
            session.activate_premium("ABCD-1234-XY").await,
            Status::error("Invalid license key. Please try again.")
        );
        assert_eq!(
            session.activate_premium("ABCD-EFGH-IJKL-MNOP").await,
            Status::success("Premium activated! Unlimited leads unlocked.")
        );

        let report = session.scrape_results(&HtmlDocument::parse(RESULTS)).await;
        assert_eq!(report.added, 3);
        assert!(session.stats().is_premium);

        let reopened = Session::open(&config(1), storage, Arc::new(FakeSites::default()))
            .await
            .unwrap();
        assert!(reopened.stats().is_premium);
        assert_eq!(reopened.leads().len(), 3);
    }

    #[tokio::test]
    async fn test_host_is_notified() {
        let storage = Arc::new(MemoryStorage::new());
        let host = Background::new(storage.clone(), Arc::new(FakeSites::default()))
            .with_clock(today)
            .spawn();
        let mut session = session(Arc::clone(&storage), 25)
            .await
            .with_host(host.clone());

        session.scrape_results(&HtmlDocument::parse(RESULTS)).await;
        let stats = host.stats().await.unwrap();
        assert_eq!(stats.total_leads, 3);
        assert_eq!(stats.daily_count, 3);
        assert_eq!(stats, session.stats());
    }
}
