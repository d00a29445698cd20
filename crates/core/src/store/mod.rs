//! Storage tiers for cached verification records.
//!
//! Three tiers, ranked by preference:
//!
//! - [`RecordDb`]: transactional SQLite database. Durable, indexed, and the
//!   only tier the expiry sweep can range-scan.
//! - [`FileKvStore`]: durable single-file key-value store with a byte
//!   quota; records are stored as one opaque serialized value per key.
//! - [`MemoryStore`]: ephemeral in-process key-value store, lost on exit.
//!
//! Natively synchronous tiers are adapted behind one async trait so the
//! façade's fallback chain has a uniform control flow.

pub mod file_kv;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use file_kv::FileKvStore;
pub use memory::MemoryStore;
pub use sqlite::RecordDb;

use crate::error::Error;
use crate::record::CachedVerificationRecord;

/// Uniform async contract implemented by every storage tier.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Short tier name used in logs.
    fn label(&self) -> &'static str;

    /// Fetch the record under `key`, or `None` on a miss. Malformed stored
    /// values count as a miss, not an error.
    async fn get(&self, key: &str) -> Result<Option<CachedVerificationRecord>, Error>;

    /// Store `record` under `key`, replacing any existing value.
    async fn put(&self, key: &str, record: &CachedVerificationRecord) -> Result<(), Error>;

    /// Remove the record under `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Remove every record whose key starts with `prefix`.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), Error>;

    /// Remove every record held by this tier.
    async fn clear_all(&self) -> Result<(), Error>;
}
