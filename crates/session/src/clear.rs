//! Clear coordination.
//!
//! Two exits from the verification flow wipe cached data: an explicit
//! start-over (full reset) and a successful submission (scoped clear). The
//! full reset raises the clear flag before the tier deletes settle, so a
//! restore racing the reset (a competing session, a reload mid-clear)
//! observes the flag even when stale records are still reachable.

use crate::selection::PersistedSelection;
use crate::state::{StateAction, StateStore};
use std::sync::Arc;
use veridraft_core::CacheFacade;

/// Coordinates data clearing across state and every storage tier.
pub struct ClearCoordinator {
    facade: Arc<CacheFacade>,
    store: StateStore,
}

impl ClearCoordinator {
    pub fn new(facade: Arc<CacheFacade>, store: StateStore) -> Self {
        Self { facade, store }
    }

    /// Wipe everything: in-memory fields, the persisted selection, and all
    /// cached records on every tier.
    ///
    /// The clear flag is raised before `clear_all` is awaited.
    pub async fn full_reset(&self) {
        self.store.dispatch(StateAction::ClearVerification);

        if let Err(e) = PersistedSelection::clear(self.facade.durable()) {
            tracing::warn!(error = %e, "selection clear failed");
        }

        self.facade.raise_clear_flag();
        self.facade.clear_all().await;
    }

    /// Clear the cached record for one identity after its submission
    /// succeeded. Other identities' records stay; no flag is raised, since
    /// no restore follows a completed submission.
    pub async fn after_submission(&self, email: Option<&str>, user_id: Option<&str>) {
        self.facade.clear(email, user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SelectionField, VerificationState};
    use veridraft_core::record::RecordPatch;
    use veridraft_core::store::{FileKvStore, MemoryStore, RecordDb};
    use veridraft_core::{CacheConfig, CacheFacade};

    async fn setup() -> (tempfile::TempDir, Arc<CacheFacade>, StateStore, ClearCoordinator) {
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
        let coordinator = ClearCoordinator::new(Arc::clone(&facade), store.clone());
        (dir, facade, store, coordinator)
    }

    #[tokio::test]
    async fn test_full_reset_wipes_state_selection_and_records() {
        let (_dir, facade, store, coordinator) = setup().await;

        store.dispatch(StateAction::SetSelfie("selfie".into()));
        store.dispatch(StateAction::SetSelectionField(SelectionField::Country, "DE".into()));
        PersistedSelection { country: Some("DE".into()), ..Default::default() }
            .save(facade.durable())
            .unwrap();
        facade
            .save(&RecordPatch { selfie_image: Some("selfie".into()), ..Default::default() }, Some("a@b.com"), None)
            .await;

        coordinator.full_reset().await;

        assert_eq!(store.snapshot(), VerificationState::default());
        assert!(PersistedSelection::load(facade.durable()).is_none());
        assert!(facade.load(Some("a@b.com"), None).await.is_none());
        // the flag is up for the next restore to observe
        assert!(facade.take_clear_flag().is_some());
    }

    #[tokio::test]
    async fn test_scoped_clear_leaves_other_identities_and_no_flag() {
        let (_dir, facade, _store, coordinator) = setup().await;

        facade
            .save(&RecordPatch { selfie_image: Some("a".into()), ..Default::default() }, Some("a@x.com"), None)
            .await;
        facade
            .save(&RecordPatch { selfie_image: Some("b".into()), ..Default::default() }, Some("b@x.com"), None)
            .await;

        coordinator.after_submission(Some("a@x.com"), None).await;

        assert!(facade.load(Some("a@x.com"), None).await.is_none());
        assert!(facade.load(Some("b@x.com"), None).await.is_some());
        assert!(facade.take_clear_flag().is_none());
    }
}
