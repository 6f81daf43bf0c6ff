//! In-process storage backend.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;

/// Storage kept in memory; lost when dropped.
#[derive(Default)]
pub struct MemoryStorage {
    map: Mutex<Map<String, Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail, as a full browser store would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn map(&self) -> Result<std::sync::MutexGuard<'_, Map<String, Value>>> {
        self.map
            .lock()
            .map_err(|_| AppError::storage("memory storage lock poisoned"))
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage("quota exceeded"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.map()?.get(key).cloned())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        self.check_writable()?;
        self.map()?.extend(entries);
        Ok(())
    }
}
