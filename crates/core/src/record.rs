//! Draft verification record and merge semantics.
//!
//! One record exists per identity/session, keyed by the derived cache key.
//! Records are merged on every write, never wholesale-replaced: a capture of
//! the selfie must not erase the document images saved a minute earlier.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One cached in-progress verification record.
///
/// The serialized shape (camelCase, absent optionals omitted) is the
/// compatibility contract for values stored in the key-value tiers:
/// `{ id, documentImageFront?, documentImageBack?, selfieImage?, timestamp,
/// email?, userId? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVerificationRecord {
    /// Derived cache key; primary key in every tier.
    pub id: String,

    /// Encoded front-of-document image payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_image_front: Option<String>,

    /// Encoded back-of-document image payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_image_back: Option<String>,

    /// Encoded selfie image payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selfie_image: Option<String>,

    /// Last-write time in Unix milliseconds; refreshed on every save and
    /// used by the expiry sweep.
    pub timestamp: i64,

    /// Identity hint carried for indexing; not required to be consistent
    /// with the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Identity hint carried for indexing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl CachedVerificationRecord {
    /// Create an empty record for `id` stamped with the current time.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document_image_front: None,
            document_image_back: None,
            selfie_image: None,
            timestamp: Utc::now().timestamp_millis(),
            email: None,
            user_id: None,
        }
    }

    /// Merge `patch` into this record.
    ///
    /// Present patch fields overwrite same-named fields; absent patch fields
    /// preserve the existing values. The timestamp is always refreshed,
    /// regardless of which fields changed.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(front) = &patch.document_image_front {
            self.document_image_front = Some(front.clone());
        }
        if let Some(back) = &patch.document_image_back {
            self.document_image_back = Some(back.clone());
        }
        if let Some(selfie) = &patch.selfie_image {
            self.selfie_image = Some(selfie.clone());
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(user_id) = &patch.user_id {
            self.user_id = Some(user_id.clone());
        }
        self.timestamp = Utc::now().timestamp_millis();
    }

    /// Whether at least one image payload is present.
    pub fn has_images(&self) -> bool {
        self.document_image_front.is_some() || self.document_image_back.is_some() || self.selfie_image.is_some()
    }
}

/// A partial write against a cached record. Absent fields are preserved
/// from the existing record when the patch is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub document_image_front: Option<String>,
    pub document_image_back: Option<String>,
    pub selfie_image: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}
