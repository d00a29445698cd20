//! Tertiary storage tier: ephemeral in-process key-value store.
//!
//! The stand-in for tab-scoped session storage: values survive for the
//! lifetime of the process and no longer. Last resort of the fallback
//! chain, and home of the anonymous session id.

use super::RecordStore;
use crate::error::Error;
use crate::record::CachedVerificationRecord;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Ephemeral string key-value store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.map.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the raw string value under `key`.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Store a raw string value under `key`.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    /// Remove the value under `key`.
    pub fn remove_raw(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Remove every value in the store.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    fn label(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CachedVerificationRecord>, Error> {
        let Some(raw) = self.get_raw(key) else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(key, error = %e, "malformed cached record, treating as miss");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, record: &CachedVerificationRecord) -> Result<(), Error> {
        let raw = serde_json::to_string(record)?;
        self.put_raw(key, &raw);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.remove_raw(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), Error> {
        self.lock().retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), Error> {
        self.clear();
        Ok(())
    }
}
