//! Tiered cache façade.
//!
//! Orchestrates the three storage tiers as an ordered fallback chain:
//! SQLite first, then the durable key-value file, then process memory.
//! Caching is advisory and never on the critical path of a submission, so
//! `save` and the clear operations never surface errors; total failure is
//! logged and swallowed, and reads degrade to a miss.
//!
//! The façade is an injected instance with an `init` lifecycle and no
//! teardown (its stores are profile-scoped); hosts construct one and pass
//! it by reference.

use crate::config::CacheConfig;
use crate::error::Error;
use crate::keys;
use crate::record::{CachedVerificationRecord, RecordPatch};
use crate::store::{FileKvStore, MemoryStore, RecordDb, RecordStore};
use chrono::Utc;

/// Reserved durable-store key for the clear flag.
///
/// The flag lives in the key-value tier, outside any record, so it can be
/// written synchronously before an asynchronous `clear_all` settles and
/// read even when the primary tier is unavailable.
pub const CLEAR_FLAG_KEY: &str = "kyc_cache_cleared_at";

/// Tiered draft cache.
pub struct CacheFacade {
    primary: Option<RecordDb>,
    durable: FileKvStore,
    ephemeral: MemoryStore,
    config: CacheConfig,
}

impl CacheFacade {
    /// Construct the façade from configuration, opening every tier.
    ///
    /// A primary tier that fails or times out on open is marked unavailable
    /// and the façade runs on the key-value tiers alone; that downgrade is
    /// logged, never returned.
    pub async fn init(config: CacheConfig) -> Self {
        let durable = FileKvStore::open(&config.kv_path, config.kv_quota_bytes);
        let ephemeral = MemoryStore::new();
        let primary = match RecordDb::open(&config.db_path, config.open_timeout()).await {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!(error = %e, "primary tier unavailable, running on key-value tiers");
                None
            }
        };
        Self::from_parts(primary, durable, ephemeral, config)
    }

    /// Assemble a façade from already-opened tiers.
    pub fn from_parts(
        primary: Option<RecordDb>, durable: FileKvStore, ephemeral: MemoryStore, config: CacheConfig,
    ) -> Self {
        Self { primary, durable, ephemeral, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The primary tier, if it opened successfully.
    pub fn primary(&self) -> Option<&RecordDb> {
        self.primary.as_ref()
    }

    /// The durable key-value tier. Also hosts values stored outside the
    /// record type (clear flag, persisted selection).
    pub fn durable(&self) -> &FileKvStore {
        &self.durable
    }

    /// The ephemeral tier.
    pub fn ephemeral(&self) -> &MemoryStore {
        &self.ephemeral
    }

    fn tiers(&self) -> Vec<&dyn RecordStore> {
        let mut tiers: Vec<&dyn RecordStore> = Vec::with_capacity(3);
        if let Some(db) = &self.primary {
            tiers.push(db);
        }
        tiers.push(&self.durable);
        tiers.push(&self.ephemeral);
        tiers
    }

    /// Derive the cache key for the given identity hints.
    ///
    /// Email wins over user id; with neither, the per-session anonymous id
    /// is read from the ephemeral tier (generated and persisted there on
    /// first use, so derivation stays idempotent within a session).
    pub fn derive_key(&self, email: Option<&str>, user_id: Option<&str>) -> String {
        if let Some(key) = keys::identified_key(&self.config.key_prefix, email, user_id) {
            return key;
        }
        let anon = match self.ephemeral.get_raw(keys::ANON_ID_KEY) {
            Some(id) => id,
            None => {
                let id = keys::generate_anonymous_id();
                self.ephemeral.put_raw(keys::ANON_ID_KEY, &id);
                id
            }
        };
        format!("{}{}", self.config.key_prefix, anon)
    }

    /// Merge `patch` into the cached record for this identity.
    ///
    /// Tries each tier in order with a full read-merge-write; the first
    /// tier that succeeds wins. Never returns an error: a save that fails
    /// on every tier is logged and swallowed.
    pub async fn save(&self, patch: &RecordPatch, email: Option<&str>, user_id: Option<&str>) {
        let key = self.derive_key(email, user_id);
        for tier in self.tiers() {
            match save_to_tier(tier, &key, patch).await {
                Ok(()) => {
                    tracing::debug!(tier = tier.label(), "draft saved");
                    return;
                }
                Err(e) => {
                    tracing::debug!(tier = tier.label(), error = %e, "tier save failed, falling back");
                }
            }
        }
        tracing::warn!("draft save failed on every tier");
    }

    /// Load the cached record for this identity, first hit across tiers.
    ///
    /// Tier errors and malformed stored values degrade to a miss.
    pub async fn load(&self, email: Option<&str>, user_id: Option<&str>) -> Option<CachedVerificationRecord> {
        let key = self.derive_key(email, user_id);
        for tier in self.tiers() {
            match tier.get(&key).await {
                Ok(Some(record)) => {
                    tracing::debug!(tier = tier.label(), "draft loaded");
                    return Some(record);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(tier = tier.label(), error = %e, "tier read failed, trying next");
                }
            }
        }
        None
    }

    /// Whether a cached record with at least one image exists for this
    /// identity.
    pub async fn has(&self, email: Option<&str>, user_id: Option<&str>) -> bool {
        self.load(email, user_id).await.is_some_and(|record| record.has_images())
    }

    /// Delete this identity's record from every tier.
    ///
    /// Each tier is cleared independently; one tier's failure does not
    /// block the others.
    pub async fn clear(&self, email: Option<&str>, user_id: Option<&str>) {
        let key = self.derive_key(email, user_id);
        for tier in self.tiers() {
            if let Err(e) = tier.delete(&key).await {
                tracing::warn!(tier = tier.label(), error = %e, "tier clear failed");
            }
        }
    }

    /// Delete every cached record from every tier.
    ///
    /// The primary record table is wiped, prefixed record keys are removed
    /// from the durable tier, and the ephemeral tier is cleared outright.
    pub async fn clear_all(&self) {
        if let Some(db) = &self.primary {
            if let Err(e) = db.clear_records().await {
                tracing::warn!(error = %e, "primary clear failed");
            }
        }
        if let Err(e) = self.durable.remove_by_prefix(&self.config.key_prefix) {
            tracing::warn!(error = %e, "durable clear failed");
        }
        self.ephemeral.clear();
    }

    /// Record that a clear happened now.
    ///
    /// Written before the caller awaits `clear_all`, so a restore racing
    /// the deletes observes the flag even when they have not yet settled.
    pub fn raise_clear_flag(&self) {
        let now = Utc::now().timestamp_millis();
        if let Err(e) = self.durable.put_raw(CLEAR_FLAG_KEY, &now.to_string()) {
            tracing::warn!(error = %e, "failed to raise clear flag");
        }
    }

    /// Read and consume the clear flag, returning when it was raised.
    ///
    /// Presence is what guards the restore path; a mangled stored value
    /// still counts as raised.
    pub fn take_clear_flag(&self) -> Option<i64> {
        let raw = self.durable.get_raw(CLEAR_FLAG_KEY)?;
        if let Err(e) = self.durable.remove_raw(CLEAR_FLAG_KEY) {
            tracing::warn!(error = %e, "failed to consume clear flag");
        }
        Some(raw.parse().unwrap_or_default())
    }
}

async fn save_to_tier(tier: &dyn RecordStore, key: &str, patch: &RecordPatch) -> Result<(), Error> {
    let mut record = tier.get(key).await?.unwrap_or_else(|| CachedVerificationRecord::new(key));
    record.apply(patch);
    tier.put(key, &record).await
}
