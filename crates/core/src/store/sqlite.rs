//! Primary storage tier: transactional SQLite database.
//!
//! This module handles opening the draft database, applying required
//! pragmas (WAL mode), running migrations, and the record CRUD the façade
//! and sweeper build on. The database runs on a background thread via
//! tokio-rusqlite; the open call is bounded by a deadline because some
//! environments neither succeed nor fail a hung open.

use super::{RecordStore, migrations};
use crate::error::Error;
use crate::record::CachedVerificationRecord;
use std::path::Path;
use std::time::Duration;
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::{Connection, params};

/// Draft database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct RecordDb {
    pub(crate) conn: Connection,
}

impl RecordDb {
    /// Open a database at the specified path, bounded by `open_timeout`.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations. An open that does not settle within
    /// the deadline returns [`Error::OpenTimeout`] so callers can mark the
    /// tier unavailable instead of stalling.
    pub async fn open(path: impl AsRef<Path>, open_timeout: Duration) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::time::timeout(open_timeout, Connection::open(path))
            .await
            .map_err(|_| Error::OpenTimeout(open_timeout.as_millis() as u64))?
            .map_err(|e| Error::Database(e.into()))?;

        Self::configure(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;

        Self::configure(conn).await
    }

    async fn configure(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// Get a record by its derived key.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn get_record(&self, key: &str) -> Result<Option<CachedVerificationRecord>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedVerificationRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, document_image_front, document_image_back, selfie_image,
                            email, user_id, timestamp
                     FROM verification_records WHERE id = ?1",
                )?;

                let result = stmt.query_row(params![key], |row| {
                    Ok(CachedVerificationRecord {
                        id: row.get(0)?,
                        document_image_front: row.get(1)?,
                        document_image_back: row.get(2)?,
                        selfie_image: row.get(3)?,
                        email: row.get(4)?,
                        user_id: row.get(5)?,
                        timestamp: row.get(6)?,
                    })
                });

                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or update a record.
    ///
    /// Uses UPSERT semantics: inserts if the key doesn't exist,
    /// updates all fields if it does.
    pub async fn put_record(&self, record: &CachedVerificationRecord) -> Result<(), Error> {
        let record = record.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO verification_records (
                        id, document_image_front, document_image_back, selfie_image,
                        email, user_id, timestamp
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(id) DO UPDATE SET
                        document_image_front = excluded.document_image_front,
                        document_image_back = excluded.document_image_back,
                        selfie_image = excluded.selfie_image,
                        email = excluded.email,
                        user_id = excluded.user_id,
                        timestamp = excluded.timestamp",
                    params![
                        &record.id,
                        &record.document_image_front,
                        &record.document_image_back,
                        &record.selfie_image,
                        &record.email,
                        &record.user_id,
                        record.timestamp,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a record by its derived key.
    pub async fn delete_record(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM verification_records WHERE id = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every record whose key starts with `prefix`.
    ///
    /// Matches on substr rather than LIKE so `_` in the prefix is literal.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_records_with_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let prefix = prefix.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM verification_records WHERE substr(id, 1, ?1) = ?2",
                    params![prefix.len() as i64, prefix],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every record in the table.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear_records(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM verification_records", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete records last written before `cutoff_millis`, using the
    /// timestamp index.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_older_than(&self, cutoff_millis: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM verification_records WHERE timestamp < ?1",
                    params![cutoff_millis],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest records until count <= max_records.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_over_cap(&self, max_records: usize) -> Result<u64, Error> {
        let max = max_records as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM verification_records", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM verification_records WHERE id IN (
                        SELECT id FROM verification_records ORDER BY timestamp ASC LIMIT ?1
                    )",
                    params![to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored records.
    pub async fn count_records(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM verification_records", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl RecordStore for RecordDb {
    fn label(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<CachedVerificationRecord>, Error> {
        self.get_record(key).await
    }

    async fn put(&self, _key: &str, record: &CachedVerificationRecord) -> Result<(), Error> {
        self.put_record(record).await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.delete_record(key).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), Error> {
        self.delete_records_with_prefix(prefix).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), Error> {
        self.clear_records().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordPatch;

    fn make_record(key: &str) -> CachedVerificationRecord {
        let mut record = CachedVerificationRecord::new(key);
        record.apply(&RecordPatch {
            document_image_front: Some("front-bytes".into()),
            email: Some("a@b.com".into()),
            ..Default::default()
        });
        record
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = RecordDb::open_in_memory().await.unwrap();
        let record = make_record("kyc_cache:a@b.com");

        db.put_record(&record).await.unwrap();

        let retrieved = db.get_record(&record.id).await.unwrap().unwrap();
        assert_eq!(retrieved, record);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = RecordDb::open_in_memory().await.unwrap();
        let result = db.get_record("kyc_cache:nobody").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let db = RecordDb::open_in_memory().await.unwrap();
        let mut record = make_record("kyc_cache:a@b.com");
        db.put_record(&record).await.unwrap();

        record.apply(&RecordPatch { selfie_image: Some("selfie-bytes".into()), ..Default::default() });
        db.put_record(&record).await.unwrap();

        let retrieved = db.get_record(&record.id).await.unwrap().unwrap();
        assert_eq!(retrieved.selfie_image.as_deref(), Some("selfie-bytes"));
        assert_eq!(retrieved.document_image_front.as_deref(), Some("front-bytes"));
        assert_eq!(db.count_records().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = RecordDb::open_in_memory().await.unwrap();
        let record = make_record("kyc_cache:a@b.com");
        db.put_record(&record).await.unwrap();

        db.delete_record(&record.id).await.unwrap();
        assert!(db.get_record(&record.id).await.unwrap().is_none());

        // deleting an absent key is fine
        db.delete_record(&record.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_by_prefix_treats_underscore_literally() {
        let db = RecordDb::open_in_memory().await.unwrap();
        db.put_record(&make_record("kyc_cache:a@b.com")).await.unwrap();
        db.put_record(&make_record("kycXcacheYa@b.com")).await.unwrap();

        let deleted = db.delete_records_with_prefix("kyc_cache:").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_record("kycXcacheYa@b.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = RecordDb::open_in_memory().await.unwrap();
        let mut stale = make_record("kyc_cache:stale");
        stale.timestamp = 1_000;
        let fresh = make_record("kyc_cache:fresh");
        db.put_record(&stale).await.unwrap();
        db.put_record(&fresh).await.unwrap();

        let deleted = db.purge_older_than(2_000).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_record("kyc_cache:stale").await.unwrap().is_none());
        assert!(db.get_record("kyc_cache:fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_over_cap_removes_oldest() {
        let db = RecordDb::open_in_memory().await.unwrap();
        for (key, ts) in [("kyc_cache:a", 100), ("kyc_cache:b", 200), ("kyc_cache:c", 300)] {
            let mut record = make_record(key);
            record.timestamp = ts;
            db.put_record(&record).await.unwrap();
        }

        let deleted = db.purge_over_cap(2).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_record("kyc_cache:a").await.unwrap().is_none());
        assert!(db.get_record("kyc_cache:c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_open_timeout_is_generous_for_real_opens() {
        let dir = tempfile::tempdir().unwrap();
        let db = RecordDb::open(dir.path().join("drafts.sqlite"), Duration::from_secs(10))
            .await
            .unwrap();
        db.put_record(&make_record("kyc_cache:a@b.com")).await.unwrap();
    }
}
