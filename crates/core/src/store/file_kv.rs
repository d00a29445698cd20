//! Secondary storage tier: durable single-file key-value store.
//!
//! Models the size-limited durable store of the original product: every
//! value is an opaque string under its key, the whole map lives in one JSON
//! file, and writes that would push the encoded file past the byte quota
//! are rejected (which the façade treats as a signal to fall through to the
//! next tier). Rewrites go through a temp file and rename so a crash never
//! leaves a half-written map.
//!
//! Besides cached records, this store holds the raw string slots that live
//! outside any record: the clear flag and the persisted selection.

use super::RecordStore;
use crate::error::Error;
use crate::record::CachedVerificationRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    quota_bytes: usize,
    map: BTreeMap<String, String>,
}

/// Durable key-value store backed by one JSON file.
///
/// Clones share the same underlying map and file.
#[derive(Clone, Debug)]
pub struct FileKvStore {
    inner: Arc<Mutex<Inner>>,
}

impl FileKvStore {
    /// Open the store at `path`, loading any existing map.
    ///
    /// A missing file starts an empty store. An unreadable or unparseable
    /// file also starts empty (with a warning) rather than failing: stored
    /// values are a cache, never the source of truth.
    pub fn open(path: impl Into<PathBuf>, quota_bytes: usize) -> Self {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding unparseable kv file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "kv file unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self { inner: Arc::new(Mutex::new(Inner { path, quota_bytes, map })) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the raw string value under `key`.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.lock().map.get(key).cloned()
    }

    /// Store a raw string value under `key`, subject to the byte quota.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QuotaExceeded`] (leaving the store unchanged) when
    /// the encoded map would outgrow the quota, or an io error if the file
    /// rewrite fails.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut inner = self.lock();
        let previous = inner.map.insert(key.to_string(), value.to_string());

        let encoded = serde_json::to_string(&inner.map)?;
        if encoded.len() > inner.quota_bytes {
            // roll back before reporting, so retries see the old state
            match previous {
                Some(p) => inner.map.insert(key.to_string(), p),
                None => inner.map.remove(key),
            };
            return Err(Error::QuotaExceeded { needed: encoded.len(), limit: inner.quota_bytes });
        }

        persist(&inner.path, &encoded)
    }

    /// Remove the value under `key`. Removing an absent key is a no-op.
    pub fn remove_raw(&self, key: &str) -> Result<(), Error> {
        let mut inner = self.lock();
        if inner.map.remove(key).is_none() {
            return Ok(());
        }
        let encoded = serde_json::to_string(&inner.map)?;
        persist(&inner.path, &encoded)
    }

    /// Remove every value whose key starts with `prefix`.
    pub fn remove_by_prefix(&self, prefix: &str) -> Result<(), Error> {
        let mut inner = self.lock();
        let before = inner.map.len();
        inner.map.retain(|key, _| !key.starts_with(prefix));
        if inner.map.len() == before {
            return Ok(());
        }
        let encoded = serde_json::to_string(&inner.map)?;
        persist(&inner.path, &encoded)
    }

    /// Remove every value in the store.
    pub fn clear(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.map.clear();
        persist(&inner.path, "{}")
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn persist(path: &Path, encoded: &str) -> Result<(), Error> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, encoded)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait::async_trait]
impl RecordStore for FileKvStore {
    fn label(&self) -> &'static str {
        "file-kv"
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
        self.put_raw(key, &raw)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.remove_raw(key)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), Error> {
        self.remove_by_prefix(prefix)
    }

    async fn clear_all(&self) -> Result<(), Error> {
        self.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordPatch;

    fn open_temp(quota: usize) -> (tempfile::TempDir, FileKvStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("kv.json"), quota);
        (dir, store)
    }

    #[test]
    fn test_raw_round_trip() {
        let (_dir, store) = open_temp(4096);
        store.put_raw("kyc_anon_id", "anon_abc123").unwrap();
        assert_eq!(store.get_raw("kyc_anon_id").as_deref(), Some("anon_abc123"));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");

        let store = FileKvStore::open(&path, 4096);
        store.put_raw("k", "v").unwrap();
        drop(store);

        let reopened = FileKvStore::open(&path, 4096);
        assert_eq!(reopened.get_raw("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_quota_rejects_and_rolls_back() {
        let (_dir, store) = open_temp(64);
        store.put_raw("small", "x").unwrap();

        let big = "y".repeat(256);
        let err = store.put_raw("big", &big).unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { .. }));

        // the oversized write left nothing behind, the old value survives
        assert!(store.get_raw("big").is_none());
        assert_eq!(store.get_raw("small").as_deref(), Some("x"));
    }

    #[test]
    fn test_quota_rollback_restores_previous_value() {
        let (_dir, store) = open_temp(64);
        store.put_raw("k", "old").unwrap();

        let big = "y".repeat(256);
        assert!(store.put_raw("k", &big).is_err());
        assert_eq!(store.get_raw("k").as_deref(), Some("old"));
    }

    #[test]
    fn test_unparseable_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = FileKvStore::open(&path, 4096);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_remove_by_prefix() {
        let (_dir, store) = open_temp(4096);
        store.put_raw("kyc_cache:a@b.com", "{}").unwrap();
        store.put_raw("kyc_cache:u1", "{}").unwrap();
        store.put_raw("kyc_selection", "{}").unwrap();

        store.remove_by_prefix("kyc_cache:").unwrap();
        assert!(store.get_raw("kyc_cache:a@b.com").is_none());
        assert!(store.get_raw("kyc_cache:u1").is_none());
        assert_eq!(store.get_raw("kyc_selection").as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let (_dir, store) = open_temp(4096);
        let mut record = CachedVerificationRecord::new("kyc_cache:a@b.com");
        record.apply(&RecordPatch { selfie_image: Some("selfie".into()), ..Default::default() });

        store.put("kyc_cache:a@b.com", &record).await.unwrap();
        let retrieved = store.get("kyc_cache:a@b.com").await.unwrap().unwrap();
        assert_eq!(retrieved, record);
    }

    #[tokio::test]
    async fn test_malformed_record_is_a_miss() {
        let (_dir, store) = open_temp(4096);
        store.put_raw("kyc_cache:a@b.com", "{{{garbage").unwrap();

        let result = store.get("kyc_cache:a@b.com").await.unwrap();
        assert!(result.is_none());
    }
}
