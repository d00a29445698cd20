//! In-memory verification state and its action seam.
//!
//! The cache subsystem never reads or writes state fields directly: the
//! restorer and the auto-persist watcher communicate with the host through
//! discrete actions dispatched into a [`StateStore`], which broadcasts
//! snapshots over a watch channel.

use std::sync::Arc;
use tokio::sync::watch;

/// Selection fields the wizard collects ahead of the document captures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionFields {
    pub country: Option<String>,
    pub city: Option<String>,
    pub document_type: Option<String>,
    pub wallet_address: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// One settable selection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionField {
    Country,
    City,
    DocumentType,
    WalletAddress,
    FirstName,
    LastName,
}

/// In-memory verification state for the active session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationState {
    pub document_front: Option<String>,
    pub document_back: Option<String>,
    pub selfie: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub selection: SelectionFields,
}

impl VerificationState {
    /// Whether at least one captured image is present.
    pub fn has_any_image(&self) -> bool {
        self.document_front.is_some() || self.document_back.is_some() || self.selfie.is_some()
    }

    fn apply(&mut self, action: StateAction) {
        match action {
            StateAction::SetDocumentFront(payload) => self.document_front = Some(payload),
            StateAction::SetDocumentBack(payload) => self.document_back = Some(payload),
            StateAction::SetSelfie(payload) => self.selfie = Some(payload),
            StateAction::SetIdentity { email, user_id } => {
                if email.is_some() {
                    self.email = email;
                }
                if user_id.is_some() {
                    self.user_id = user_id;
                }
            }
            StateAction::SetSelectionField(field, value) => {
                let slot = match field {
                    SelectionField::Country => &mut self.selection.country,
                    SelectionField::City => &mut self.selection.city,
                    SelectionField::DocumentType => &mut self.selection.document_type,
                    SelectionField::WalletAddress => &mut self.selection.wallet_address,
                    SelectionField::FirstName => &mut self.selection.first_name,
                    SelectionField::LastName => &mut self.selection.last_name,
                };
                *slot = Some(value);
            }
            StateAction::ClearVerification => *self = Self::default(),
        }
    }
}

/// A discrete state mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateAction {
    SetDocumentFront(String),
    SetDocumentBack(String),
    SetSelfie(String),
    SetIdentity { email: Option<String>, user_id: Option<String> },
    SetSelectionField(SelectionField, String),
    ClearVerification,
}

/// Action-dispatching state container with snapshot broadcast.
///
/// Clones share the same state.
#[derive(Clone, Debug)]
pub struct StateStore {
    tx: Arc<watch::Sender<VerificationState>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(VerificationState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Apply an action and notify subscribers with the new snapshot.
    pub fn dispatch(&self, action: StateAction) {
        self.tx.send_modify(|state| state.apply(action));
    }

    /// The current state.
    pub fn snapshot(&self) -> VerificationState {
        self.tx.borrow().clone()
    }

    /// Subscribe to state snapshots. The value current at subscription time
    /// counts as seen; only later dispatches wake the receiver.
    pub fn subscribe(&self) -> watch::Receiver<VerificationState> {
        self.tx.subscribe()
    }
}
