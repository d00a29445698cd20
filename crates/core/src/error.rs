//! Unified error types for the veridraft storage tiers.
//!
//! Every failure class here is non-fatal at the façade boundary: writes fall
//! through to the next tier and reads degrade to a miss. The variants exist
//! so the chain can log precisely which tier failed and how.

use tokio_rusqlite::rusqlite;

/// Unified error type for the draft cache subsystem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Primary database operation failed.
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Opening a storage tier did not settle within its deadline.
    #[error("storage open timed out after {0}ms")]
    OpenTimeout(u64),

    /// Tier cannot be used in this environment.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Durable key-value store would exceed its byte quota.
    #[error("quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Record (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
