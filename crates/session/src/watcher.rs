//! Auto-persist watcher.
//!
//! A background task subscribed to state snapshots. Whenever the state
//! changes outside a restore, it writes the selection fields straight to
//! the durable store and, if any image is captured, the image fields
//! through the cache façade. Dispatch is never blocked and failures are
//! logged only.

use crate::restore::RestoreGate;
use crate::selection::PersistedSelection;
use crate::state::{StateStore, VerificationState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use veridraft_core::{CacheFacade, RecordPatch};

/// Spawn the watcher task. It ends when the state store is dropped.
pub fn spawn(store: &StateStore, facade: Arc<CacheFacade>, gate: Arc<RestoreGate>) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            if gate.is_restoring() {
                continue;
            }
            let snapshot = rx.borrow_and_update().clone();
            persist(&facade, &snapshot).await;
        }
    })
}

async fn persist(facade: &CacheFacade, snapshot: &VerificationState) {
    let selection = PersistedSelection::from_state(snapshot);
    if !selection.is_empty() {
        if let Err(e) = selection.save(facade.durable()) {
            tracing::debug!(error = %e, "selection persist failed");
        }
    }

    if !snapshot.has_any_image() {
        return;
    }
    let patch = RecordPatch {
        document_image_front: snapshot.document_front.clone(),
        document_image_back: snapshot.document_back.clone(),
        selfie_image: snapshot.selfie.clone(),
        email: snapshot.email.clone(),
        user_id: snapshot.user_id.clone(),
    };
    facade.save(&patch, snapshot.email.as_deref(), snapshot.user_id.as_deref()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SelectionField, StateAction};
    use std::time::Duration;
    use veridraft_core::CacheConfig;
    use veridraft_core::store::{FileKvStore, MemoryStore, RecordDb};

    async fn setup() -> (tempfile::TempDir, Arc<CacheFacade>, StateStore, Arc<RestoreGate>, JoinHandle<()>) {
        let dir = tempfile::tempdir().unwrap();
        let durable = FileKvStore::open(dir.path().join("kv.json"), 1024 * 1024);
        let primary = RecordDb::open_in_memory().await.unwrap();
        let facade = Arc::new(CacheFacade::from_parts(
            Some(primary),
            durable,
            MemoryStore::new(),
            CacheConfig::default(),
        ));
        let store = StateStore::new();
        let gate = Arc::new(RestoreGate::new());
        let handle = spawn(&store, Arc::clone(&facade), Arc::clone(&gate));
        (dir, facade, store, gate, handle)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_image_capture_is_persisted() {
        let (_dir, facade, store, _gate, _handle) = setup().await;

        store.dispatch(StateAction::SetIdentity { email: Some("a@b.com".into()), user_id: None });
        store.dispatch(StateAction::SetDocumentFront("front".into()));
        settle().await;

        let record = facade.load(Some("a@b.com"), None).await.unwrap();
        assert_eq!(record.document_image_front.as_deref(), Some("front"));
        assert_eq!(record.email.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_selection_changes_reach_the_durable_store() {
        let (_dir, facade, store, _gate, _handle) = setup().await;

        store.dispatch(StateAction::SetSelectionField(SelectionField::Country, "DE".into()));
        settle().await;

        let selection = PersistedSelection::load(facade.durable()).unwrap();
        assert_eq!(selection.country.as_deref(), Some("DE"));
        // no image captured yet, so no draft record either
        assert!(facade.load(None, None).await.is_none());
    }

    #[tokio::test]
    async fn test_no_writes_while_gate_is_held() {
        let (_dir, facade, store, gate, _handle) = setup().await;

        {
            let _hold = gate.hold();
            store.dispatch(StateAction::SetSelfie("selfie".into()));
            settle().await;
        }
        assert!(facade.load(None, None).await.is_none());

        store.dispatch(StateAction::SetDocumentBack("back".into()));
        settle().await;

        let record = facade.load(None, None).await.unwrap();
        assert_eq!(record.selfie_image.as_deref(), Some("selfie"));
        assert_eq!(record.document_image_back.as_deref(), Some("back"));
    }

    #[tokio::test]
    async fn test_watcher_coalesces_rapid_dispatches() {
        let (_dir, facade, store, _gate, _handle) = setup().await;

        store.dispatch(StateAction::SetDocumentFront("front".into()));
        store.dispatch(StateAction::SetDocumentBack("back".into()));
        store.dispatch(StateAction::SetSelfie("selfie".into()));
        settle().await;

        let record = facade.load(None, None).await.unwrap();
        assert!(record.document_image_front.is_some());
        assert!(record.document_image_back.is_some());
        assert!(record.selfie_image.is_some());
    }
}
