//! Persisted selection fields.
//!
//! The lightweight counterpart of the draft record: country, id-type,
//! wallet and personal-info fields never carry image payloads, so they are
//! stored straight in the durable key-value tier under one reserved key
//! rather than through the tiered façade. Written on every relevant state
//! change, read once at startup, cleared together with the records on a
//! full reset.

use crate::state::{SelectionField, StateAction, StateStore, VerificationState};
use serde::{Deserialize, Serialize};
use veridraft_core::Error;
use veridraft_core::store::FileKvStore;

/// Reserved durable-store key for the persisted selection.
pub const SELECTION_KEY: &str = "kyc_selection";

/// Selection and identity-hint fields persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PersistedSelection {
    /// Capture the persistable fields out of a state snapshot.
    pub fn from_state(state: &VerificationState) -> Self {
        Self {
            country: state.selection.country.clone(),
            city: state.selection.city.clone(),
            document_type: state.selection.document_type.clone(),
            wallet_address: state.selection.wallet_address.clone(),
            first_name: state.selection.first_name.clone(),
            last_name: state.selection.last_name.clone(),
            email: state.email.clone(),
            user_id: state.user_id.clone(),
        }
    }

    /// Read the stored selection; absent or malformed values are `None`.
    pub fn load(store: &FileKvStore) -> Option<Self> {
        let raw = store.get_raw(SELECTION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(selection) => Some(selection),
            Err(e) => {
                tracing::warn!(error = %e, "malformed persisted selection, ignoring");
                None
            }
        }
    }

    /// Write the selection to the durable store.
    pub fn save(&self, store: &FileKvStore) -> Result<(), Error> {
        let raw = serde_json::to_string(self)?;
        store.put_raw(SELECTION_KEY, &raw)
    }

    /// Remove the stored selection.
    pub fn clear(store: &FileKvStore) -> Result<(), Error> {
        store.remove_raw(SELECTION_KEY)
    }

    /// Replay every present field into the state container via actions.
    pub fn replay(&self, store: &StateStore) {
        if self.email.is_some() || self.user_id.is_some() {
            store.dispatch(StateAction::SetIdentity { email: self.email.clone(), user_id: self.user_id.clone() });
        }
        let fields = [
            (SelectionField::Country, &self.country),
            (SelectionField::City, &self.city),
            (SelectionField::DocumentType, &self.document_type),
            (SelectionField::WalletAddress, &self.wallet_address),
            (SelectionField::FirstName, &self.first_name),
            (SelectionField::LastName, &self.last_name),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                store.dispatch(StateAction::SetSelectionField(field, value.clone()));
            }
        }
    }

    /// Whether nothing is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
