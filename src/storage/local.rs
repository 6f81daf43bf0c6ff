//! Local filesystem storage implementation.
//!
//! Keeps the whole key-value map in one JSON document under the storage
//! directory. Every write rewrites that document atomically.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml      # Harvester configuration
//! └── storage.json     # Leads and usage counters
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;

const STORE_FILE: &str = "storage.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    max_bytes: Option<u64>,
    lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            max_bytes: None,
            lock: Mutex::new(()),
        }
    }

    /// Reject writes that would grow the document beyond `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn path(&self) -> PathBuf {
        self.root_dir.join(STORE_FILE)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let path = self.path();
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read the whole map, empty if the file doesn't exist.
    async fn read_map(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(map)?;
        if let Some(max) = self.max_bytes {
            if bytes.len() as u64 > max {
                return Err(AppError::storage(format!(
                    "quota exceeded: {} bytes > {} allowed",
                    bytes.len(),
                    max
                )));
            }
        }
        self.write_bytes(&bytes).await
    }
}

#[async_trait]
impl KeyValueStore for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.extend(entries);
        self.write_map(&map).await?;
        log::debug!("Wrote {} to {}", STORE_FILE, self.root_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::Lead;
    use crate::storage::{load_leads, save_leads};

    fn single(key: &str, value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        map
    }

    #[tokio::test]
    async fn test_set_get_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.set(single("a", json!(1))).await.unwrap();
        storage.set(single("b", json!("two"))).await.unwrap();

        let reopened = LocalStorage::new(dir.path());
        assert_eq!(reopened.get("a").await.unwrap(), Some(json!(1)));
        assert_eq!(reopened.get("b").await.unwrap(), Some(json!("two")));
        assert_eq!(reopened.get("c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quota_exceeded_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).with_max_bytes(Some(600));
        save_leads(&storage, &[Lead::new("Small")]).await.unwrap();

        let many: Vec<Lead> = (0..20).map(|i| Lead::new(format!("Lead {i}"))).collect();
        let err = save_leads(&storage, &many).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        let kept = load_leads(&storage).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Small");
    }
}
