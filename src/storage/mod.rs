//! Persistent key-value storage.
//!
//! Mirrors a browser extension's local storage: a flat map of keys to JSON
//! values, where every write replaces whole values.
//!
//! ## Keys
//!
//! ```text
//! lh_leads           # array of leads
//! lh_daily_count     # leads committed on lh_daily_date
//! lh_daily_date      # YYYY-MM-DD
//! lh_total_lifetime  # leads committed ever
//! lh_is_premium      # bool
//! lh_license_key     # string
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::models::{Lead, QuotaState};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Storage key names.
pub mod keys {
    pub const LEADS: &str = "lh_leads";
    pub const DAILY_COUNT: &str = "lh_daily_count";
    pub const DAILY_DATE: &str = "lh_daily_date";
    pub const TOTAL_LIFETIME: &str = "lh_total_lifetime";
    pub const IS_PREMIUM: &str = "lh_is_premium";
    pub const LICENSE_KEY: &str = "lh_license_key";
}

/// Trait for key-value storage backends.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read one value; `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write several keys together, replacing their previous values.
    async fn set(&self, entries: Map<String, Value>) -> Result<()>;
}

fn entries<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

async fn get_as<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

/// Load the persisted lead array; empty when absent.
pub async fn load_leads(store: &dyn KeyValueStore) -> Result<Vec<Lead>> {
    Ok(get_as(store, keys::LEADS).await?.unwrap_or_default())
}

/// Replace the persisted lead array.
pub async fn save_leads(store: &dyn KeyValueStore, leads: &[Lead]) -> Result<()> {
    let leads = serde_json::to_value(leads)?;
    store.set(entries([(keys::LEADS, leads)])).await
}

/// Load the usage counters; zeroed when absent.
pub async fn load_quota(store: &dyn KeyValueStore) -> Result<QuotaState> {
    Ok(QuotaState {
        daily_count: get_as(store, keys::DAILY_COUNT).await?.unwrap_or(0),
        daily_date: get_as::<NaiveDate>(store, keys::DAILY_DATE).await?,
        lifetime_count: get_as(store, keys::TOTAL_LIFETIME).await?.unwrap_or(0),
        is_premium: get_as(store, keys::IS_PREMIUM).await?.unwrap_or(false),
    })
}

/// Persist all usage counters in one write.
pub async fn save_quota(store: &dyn KeyValueStore, state: &QuotaState) -> Result<()> {
    store
        .set(entries([
            (keys::DAILY_COUNT, json!(state.daily_count)),
            (keys::DAILY_DATE, json!(state.daily_date)),
            (keys::TOTAL_LIFETIME, json!(state.lifetime_count)),
            (keys::IS_PREMIUM, json!(state.is_premium)),
        ]))
        .await
}

/// Persist the premium flag together with the accepted license key.
pub async fn save_premium(store: &dyn KeyValueStore, license_key: &str) -> Result<()> {
    store
        .set(entries([
            (keys::IS_PREMIUM, json!(true)),
            (keys::LICENSE_KEY, json!(license_key)),
        ]))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_when_absent() {
        let store = MemoryStorage::new();
        assert!(load_leads(&store).await.unwrap().is_empty());
        assert_eq!(load_quota(&store).await.unwrap(), QuotaState::default());
    }

    #[tokio::test]
    async fn test_quota_uses_plain_keys() {
        let store = MemoryStorage::new();
        let state = QuotaState {
            daily_count: 3,
            daily_date: NaiveDate::from_ymd_opt(2026, 1, 15),
            lifetime_count: 12,
            is_premium: false,
        };
        save_quota(&store, &state).await.unwrap();

        assert_eq!(store.get(keys::DAILY_DATE).await.unwrap(), Some(json!("2026-01-15")));
        assert_eq!(store.get(keys::DAILY_COUNT).await.unwrap(), Some(json!(3)));
        assert_eq!(load_quota(&store).await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_save_premium_sets_flag_and_key() {
        let store = MemoryStorage::new();
        save_premium(&store, "ABCD-EFGH-IJKL-MNOP").await.unwrap();
        assert!(load_quota(&store).await.unwrap().is_premium);
        assert_eq!(
            store.get(keys::LICENSE_KEY).await.unwrap(),
            Some(json!("ABCD-EFGH-IJKL-MNOP"))
        );
    }
}
