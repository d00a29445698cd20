//! Expiry sweep over the primary tier.
//!
//! Removes draft records whose last write is older than the configured TTL,
//! then trims the table down to the record cap. Only the primary tier has a
//! timestamp index to range-scan, so sweeping is best effort: records that
//! only exist in the key-value tiers age out when they are overwritten or
//! cleared. Callers run the sweep fire-and-forget; it reports what it did
//! through the return value and logs.

use crate::facade::CacheFacade;
use chrono::Utc;

/// Remove expired and over-cap records from the primary tier.
///
/// Returns the number of records removed; 0 when the primary tier is
/// unavailable or the sweep fails (failures are logged, not surfaced).
pub async fn sweep(facade: &CacheFacade) -> u64 {
    let Some(db) = facade.primary() else {
        tracing::debug!("primary tier unavailable, skipping sweep");
        return 0;
    };

    let cutoff = Utc::now().timestamp_millis() - facade.config().ttl_millis();
    let mut removed = match db.purge_older_than(cutoff).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(error = %e, "expiry sweep failed");
            return 0;
        }
    };

    match db.purge_over_cap(facade.config().max_records).await {
        Ok(count) => removed += count,
        Err(e) => tracing::warn!(error = %e, "record-cap sweep failed"),
    }

    if removed > 0 {
        tracing::info!(removed, "swept expired drafts");
    }
    removed
}
