//! Cache key derivation.
//!
//! A record's key is a pure function of the best identity hint available,
//! checked in priority order: email, then user id, then a per-session
//! anonymous id. Identified users get identity-stable keys so the same
//! email reconnects to the same record; anonymous users get a stable key
//! for the lifetime of the ephemeral store.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reserved ephemeral-store key holding the anonymous session id.
pub const ANON_ID_KEY: &str = "kyc_anon_id";

static ANON_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Derive the cache key for an identified user, if any hint is present.
///
/// Email wins over user id. Returns `None` when neither hint is given; the
/// caller falls back to the anonymous session id.
pub fn identified_key(prefix: &str, email: Option<&str>, user_id: Option<&str>) -> Option<String> {
    if let Some(email) = email {
        return Some(format!("{prefix}{email}"));
    }
    user_id.map(|id| format!("{prefix}{id}"))
}

/// Generate a fresh anonymous session id.
///
/// Seeded from wall-clock nanos, the process id, and a process-local
/// counter, so ids stay distinct even when two are generated within one
/// clock tick.
pub fn generate_anonymous_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(ANON_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());

    let digest = hex::encode(hasher.finalize());
    format!("anon_{}", &digest[..16])
}
