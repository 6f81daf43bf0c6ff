// src/services/quota.rs

//! Quota state machine.
//!
//! Free users may commit a fixed number of leads per calendar day (UTC);
//! premium users are unlimited. Every change is written back to storage
//! together with the other counters.

use chrono::{NaiveDate, Utc};

use crate::error::Result;
use crate::models::{QuotaCheck, QuotaState};
use crate::storage::{self, KeyValueStore};

const MIN_KEY_CHARS: usize = 8;
const VALID_KEY_CHARS: usize = 16;

/// Outcome of a premium activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Fewer than 8 characters after trimming.
    TooShort,
    /// Between 8 and 15 characters after trimming.
    InvalidFormat,
    /// Accepted; carries the trimmed key that was stored.
    Activated(String),
}

/// Calendar-day source, swappable in tests.
pub type Clock = fn() -> NaiveDate;

/// The current calendar day in UTC.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Tracks daily and lifetime usage against the free limit.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    state: QuotaState,
    limit: u32,
    clock: Clock,
}

impl QuotaTracker {
    pub fn new(state: QuotaState, limit: u32) -> Self {
        Self {
            state,
            limit,
            clock: utc_today,
        }
    }

    /// Replace the calendar-day source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Load the persisted counters.
    pub async fn load(store: &dyn KeyValueStore, limit: u32) -> Result<Self> {
        Ok(Self::new(storage::load_quota(store).await?, limit))
    }

    pub fn state(&self) -> &QuotaState {
        &self.state
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Gate an extraction or enrichment batch.
    ///
    /// A counter left over from a previous day is reset and persisted first.
    pub async fn check_allowed(&mut self, store: &dyn KeyValueStore) -> Result<QuotaCheck> {
        if self.state.normalize(self.today()) {
            log::debug!("Daily counter reset for {}", self.today());
            storage::save_quota(store, &self.state).await?;
        }
        Ok(self.state.check(self.limit))
    }

    /// Record `n` committed leads and persist the counters.
    pub async fn increment(&mut self, store: &dyn KeyValueStore, n: u32) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.state.record(self.today(), n);
        log::debug!(
            "Committed {} lead(s); today {}, lifetime {}",
            n,
            self.state.daily_count,
            self.state.lifetime_count
        );
        storage::save_quota(store, &self.state).await
    }

    /// Validate a license key and switch to premium when it is accepted.
    pub async fn activate_premium(
        &mut self,
        store: &dyn KeyValueStore,
        key: &str,
    ) -> Result<Activation> {
        let key = key.trim();
        let len = key.chars().count();
        if len < MIN_KEY_CHARS {
            return Ok(Activation::TooShort);
        }
        if len < VALID_KEY_CHARS {
            return Ok(Activation::InvalidFormat);
        }

        storage::save_premium(store, key).await?;
        self.state.is_premium = true;
        log::info!("Premium activated");
        Ok(Activation::Activated(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Remaining;
    use crate::storage::{MemoryStorage, keys};

    fn day_one() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn day_two() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn tracker(state: QuotaState) -> QuotaTracker {
        QuotaTracker::new(state, 25).with_clock(day_one)
    }

    #[tokio::test]
    async fn test_batch_truncated_to_remaining() {
        let store = MemoryStorage::new();
        let mut quota = tracker(QuotaState {
            daily_count: 24,
            daily_date: Some(day_one()),
            lifetime_count: 100,
            is_premium: false,
        });

        let check = quota.check_allowed(&store).await.unwrap();
        assert!(check.allowed);
        let committed = check.remaining.clamp(5);
        assert_eq!(committed, 1);

        quota.increment(&store, committed as u32).await.unwrap();
        assert_eq!(quota.state().daily_count, 25);
        assert_eq!(quota.state().lifetime_count, 101);
        assert!(!quota.check_allowed(&store).await.unwrap().allowed);

        let persisted = storage::load_quota(&store).await.unwrap();
        assert_eq!(persisted.daily_count, 25);
    }

    #[tokio::test]
    async fn test_premium_increments_unbounded() {
        let store = MemoryStorage::new();
        let mut quota = tracker(QuotaState {
            daily_count: 24,
            daily_date: Some(day_one()),
            is_premium: true,
            ..QuotaState::default()
        });
        let check = quota.check_allowed(&store).await.unwrap();
        assert_eq!(check.remaining, Remaining::Unlimited);
        quota.increment(&store, 5).await.unwrap();
        assert_eq!(quota.state().daily_count, 29);
    }

    #[tokio::test]
    async fn test_stale_day_resets_and_persists() {
        let store = MemoryStorage::new();
        let mut quota = QuotaTracker::new(
            QuotaState {
                daily_count: 25,
                daily_date: Some(day_one()),
                lifetime_count: 25,
                is_premium: false,
            },
            25,
        )
        .with_clock(day_two);

        let check = quota.check_allowed(&store).await.unwrap();
        assert!(check.allowed);
        assert_eq!(check.remaining, Remaining::Limited(25));

        let persisted = storage::load_quota(&store).await.unwrap();
        assert_eq!(persisted.daily_count, 0);
        assert_eq!(persisted.daily_date, Some(day_two()));
        assert_eq!(persisted.lifetime_count, 25);
    }

    #[tokio::test]
    async fn test_activation_thresholds() {
        let store = MemoryStorage::new();
        let mut quota = tracker(QuotaState::default());

        assert_eq!(
            quota.activate_premium(&store, "  short ").await.unwrap(),
            Activation::TooShort
        );
        assert_eq!(
            quota.activate_premium(&store, "ABCD-EFGH-123").await.unwrap(),
            Activation::InvalidFormat
        );
        assert!(!quota.state().is_premium);
        assert_eq!(store.get(keys::LICENSE_KEY).await.unwrap(), None);

        let outcome = quota
            .activate_premium(&store, " ABCD-EFGH-IJKL-MNOP ")
            .await
            .unwrap();
        assert_eq!(outcome, Activation::Activated("ABCD-EFGH-IJKL-MNOP".to_string()));
        assert!(quota.state().is_premium);
        assert!(storage::load_quota(&store).await.unwrap().is_premium);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_memory_state() {
        let store = MemoryStorage::new();
        store.set_fail_writes(true);
        let mut quota = tracker(QuotaState {
            daily_date: Some(day_one()),
            ..QuotaState::default()
        });
        assert!(quota.increment(&store, 3).await.is_err());
        assert_eq!(quota.state().daily_count, 3);
    }
}
