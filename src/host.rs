// src/host.rs

//! Host messaging channel.
//!
//! The scraping session never touches the network or aggregate views itself;
//! it sends typed requests to a background service and awaits exactly one
//! response per request. The background owns the fetch proxy and reads the
//! shared storage.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::error::{AppError, Result};
use crate::models::{Lead, Stats};
use crate::services::quota::{Clock, utc_today};
use crate::storage::{self, KeyValueStore};
use crate::utils::http::FetchProxy;

const CHANNEL_CAPACITY: usize = 32;

/// Request sent to the background service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostRequest {
    FetchPage { url: String },
    LeadsScraped { count: usize },
    GetStats,
    ExportLeads,
    ClearLeads,
}

/// Response to a [`HostRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostResponse {
    Page { text: String },
    Failure { error: String },
    Ack { total_leads: usize },
    Stats(Stats),
    Leads { leads: Vec<Lead> },
    Cleared,
}

/// Background service answering host requests.
#[derive(Clone)]
pub struct Background {
    storage: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn FetchProxy>,
    clock: Clock,
}

impl Background {
    pub fn new(storage: Arc<dyn KeyValueStore>, fetcher: Arc<dyn FetchProxy>) -> Self {
        Self {
            storage,
            fetcher,
            clock: utc_today,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Answer one request. Failures become [`HostResponse::Failure`].
    pub async fn handle(&self, request: HostRequest) -> HostResponse {
        match self.try_handle(request).await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("Host request failed: {e}");
                HostResponse::Failure {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_handle(&self, request: HostRequest) -> Result<HostResponse> {
        match request {
            HostRequest::FetchPage { url } => match self.fetcher.fetch_page(&url).await {
                Ok(text) => Ok(HostResponse::Page { text }),
                Err(AppError::Fetch { reason, .. }) => Ok(HostResponse::Failure { error: reason }),
                Err(e) => Err(e),
            },
            HostRequest::LeadsScraped { count } => {
                let total_leads = storage::load_leads(self.storage.as_ref()).await?.len();
                log::info!("{count} lead(s) scraped, {total_leads} stored");
                Ok(HostResponse::Ack { total_leads })
            }
            HostRequest::GetStats => Ok(HostResponse::Stats(self.stats().await?)),
            HostRequest::ExportLeads => {
                let leads = storage::load_leads(self.storage.as_ref()).await?;
                Ok(HostResponse::Leads { leads })
            }
            HostRequest::ClearLeads => {
                storage::save_leads(self.storage.as_ref(), &[]).await?;
                Ok(HostResponse::Cleared)
            }
        }
    }

    /// Aggregate counters as stored; a stale daily counter reads as zero.
    pub async fn stats(&self) -> Result<Stats> {
        let store = self.storage.as_ref();
        let quota = storage::load_quota(store).await?;
        let leads = storage::load_leads(store).await?;
        Ok(Stats {
            daily_count: quota.count_on((self.clock)()),
            lifetime: quota.lifetime_count,
            is_premium: quota.is_premium,
            ..Stats::default()
        }
        .with_leads(&leads))
    }

    /// Run the service on the current runtime and return a handle to it.
    ///
    /// Each request is answered on its own task, so a slow fetch does not
    /// hold up a stats query. The service stops once every handle is dropped.
    pub fn spawn(self) -> HostChannel {
        let (tx, mut rx) = mpsc::channel::<Envelope>(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(Envelope { request, reply }) = rx.recv().await {
                let service = self.clone();
                tokio::spawn(async move {
                    let response = service.handle(request).await;
                    if reply.send(response).is_err() {
                        log::debug!("Host request abandoned by sender");
                    }
                });
            }
            log::debug!("Host channel closed");
        });
        HostChannel { tx }
    }
}

struct Envelope {
    request: HostRequest,
    reply: oneshot::Sender<HostResponse>,
}

/// Cloneable handle for sending requests to a spawned [`Background`].
#[derive(Clone)]
pub struct HostChannel {
    tx: mpsc::Sender<Envelope>,
}

impl HostChannel {
    /// Send a request and wait for its response.
    pub async fn request(&self, request: HostRequest) -> Result<HostResponse> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| AppError::channel("background service is not running"))?;
        response
            .await
            .map_err(|_| AppError::channel("background service dropped the request"))
    }

    /// Tell the background that leads were committed.
    pub async fn notify_scraped(&self, count: usize) -> Result<usize> {
        match self.request(HostRequest::LeadsScraped { count }).await? {
            HostResponse::Ack { total_leads } => Ok(total_leads),
            HostResponse::Failure { error } => Err(AppError::channel(error)),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn stats(&self) -> Result<Stats> {
        match self.request(HostRequest::GetStats).await? {
            HostResponse::Stats(stats) => Ok(stats),
            HostResponse::Failure { error } => Err(AppError::channel(error)),
            other => Err(unexpected(&other)),
        }
    }
}

#[async_trait]
impl FetchProxy for HostChannel {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let request = HostRequest::FetchPage {
            url: url.to_string(),
        };
        match self.request(request).await? {
            HostResponse::Page { text } => Ok(text),
            HostResponse::Failure { error } => Err(AppError::fetch(url, error)),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &HostResponse) -> AppError {
    AppError::channel(format!("unexpected response: {response:?}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::models::QuotaState;
    use crate::storage::MemoryStorage;

    struct EchoProxy;

    #[async_trait]
    impl FetchProxy for EchoProxy {
        async fn fetch_page(&self, url: &str) -> Result<String> {
            if url.contains("down") {
                return Err(AppError::fetch(url, "HTTP 503"));
            }
            Ok(format!("page of {url}"))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    fn background(store: Arc<MemoryStorage>) -> Background {
        Background::new(store, Arc::new(EchoProxy)).with_clock(today)
    }

    #[test]
    fn test_request_wire_format() {
        let request = HostRequest::FetchPage {
            url: "acme.example".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"type": "FETCH_PAGE", "url": "acme.example"})
        );
        let parsed: HostRequest = serde_json::from_value(json!({"type": "GET_STATS"})).unwrap();
        assert_eq!(parsed, HostRequest::GetStats);
    }

    #[tokio::test]
    async fn test_stats_ignore_stale_daily_count() {
        let store = Arc::new(MemoryStorage::new());
        let mut with_email = Lead::new("A");
        with_email.email = "info@a.io".to_string();
        let mut with_phone = Lead::new("B");
        with_phone.phone = "555-1234".to_string();
        storage::save_leads(store.as_ref(), &[with_email, with_phone]).await.unwrap();
        storage::save_quota(
            store.as_ref(),
            &QuotaState {
                daily_count: 7,
                daily_date: NaiveDate::from_ymd_opt(2026, 5, 3),
                lifetime_count: 30,
                is_premium: false,
            },
        )
        .await
        .unwrap();

        let stats = background(store).stats().await.unwrap();
        assert_eq!(
            stats,
            Stats {
                total_leads: 2,
                daily_count: 0,
                lifetime: 30,
                email_count: 1,
                phone_count: 1,
                is_premium: false,
            }
        );
    }

    #[tokio::test]
    async fn test_channel_round_trips() {
        let store = Arc::new(MemoryStorage::new());
        storage::save_leads(store.as_ref(), &[Lead::new("A")]).await.unwrap();
        let channel = background(Arc::clone(&store)).spawn();

        assert_eq!(channel.fetch_page("acme.example").await.unwrap(), "page of acme.example");
        match channel.fetch_page("down.example").await.unwrap_err() {
            AppError::Fetch { url, reason } => {
                assert_eq!(url, "down.example");
                assert_eq!(reason, "HTTP 503");
            }
            other => panic!("expected fetch error, got {other:?}"),
        }

        assert_eq!(channel.notify_scraped(1).await.unwrap(), 1);
        assert_eq!(channel.stats().await.unwrap().total_leads, 1);

        match channel.request(HostRequest::ExportLeads).await.unwrap() {
            HostResponse::Leads { leads } => assert_eq!(leads[0].name, "A"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            channel.request(HostRequest::ClearLeads).await.unwrap(),
            HostResponse::Cleared
        );
        assert!(storage::load_leads(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_each_get_one_response() {
        let channel = background(Arc::new(MemoryStorage::new())).spawn();
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let channel = channel.clone();
                tokio::spawn(async move { channel.fetch_page(&format!("site{i}.example")).await })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), format!("page of site{i}.example"));
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let store = Arc::new(MemoryStorage::new());
        store.set_fail_writes(true);
        let response = background(store).handle(HostRequest::ClearLeads).await;
        assert!(matches!(response, HostResponse::Failure { .. }));
    }
}
