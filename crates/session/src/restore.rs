//! One-shot session restore.
//!
//! On application start the restorer replays persisted state back into the
//! state container: selection fields from the durable store first, then,
//! unless a clear flag or a reset route says otherwise, the cached image
//! payloads from the tiered façade. The whole sequence runs behind the
//! restore gate so the auto-persist watcher cannot write partially-restored
//! state back into the cache as if it were fresh user input.

use crate::selection::PersistedSelection;
use crate::state::{StateAction, StateStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use veridraft_core::{CacheFacade, sweeper};

/// Two-state restore guard: `Idle` or `Restoring`.
///
/// Not a true mutex: the runtime is cooperative and the gate is only ever
/// held by the restorer, but the watcher consults it before every write.
#[derive(Debug, Default)]
pub struct RestoreGate {
    restoring: AtomicBool,
}

impl RestoreGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a restore is currently in progress.
    pub fn is_restoring(&self) -> bool {
        self.restoring.load(Ordering::SeqCst)
    }

    /// Enter the `Restoring` state until the returned hold is dropped.
    pub fn hold(&self) -> GateHold<'_> {
        self.restoring.store(true, Ordering::SeqCst);
        GateHold(self)
    }
}

/// Releases the gate back to `Idle` on drop.
pub struct GateHold<'a>(&'a RestoreGate);

impl Drop for GateHold<'_> {
    fn drop(&mut self) {
        self.0.restoring.store(false, Ordering::SeqCst);
    }
}

/// Replays persisted verification data into in-memory state at startup.
pub struct SessionRestorer {
    facade: Arc<CacheFacade>,
    store: StateStore,
    gate: Arc<RestoreGate>,
    started: AtomicBool,
}

impl SessionRestorer {
    pub fn new(facade: Arc<CacheFacade>, store: StateStore, gate: Arc<RestoreGate>) -> Self {
        Self { facade, store, gate, started: AtomicBool::new(false) }
    }

    /// Run the restore sequence once; later calls are no-ops.
    ///
    /// `current_route` is the route the application started on; routes that
    /// themselves produce a clear skip restoration entirely.
    pub async fn run(&self, current_route: &str) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("restore already ran, skipping");
            return;
        }

        let _hold = self.gate.hold();

        if self.facade.config().is_reset_route(current_route) {
            tracing::debug!(route = current_route, "reset route, skipping restore");
            return;
        }

        let selection = PersistedSelection::load(self.facade.durable());
        if let Some(selection) = &selection {
            selection.replay(&self.store);
        }

        if let Some(raised_at) = self.facade.take_clear_flag() {
            // a clear happened; leave the image fields empty even though a
            // record might still exist in some tier
            tracing::debug!(raised_at, "clear flag observed, skipping draft restore");
            return;
        }

        let (email, user_id) = match &selection {
            Some(s) => (s.email.as_deref(), s.user_id.as_deref()),
            None => (None, None),
        };
        if let Some(record) = self.facade.load(email, user_id).await {
            if let Some(front) = record.document_image_front {
                self.store.dispatch(StateAction::SetDocumentFront(front));
            }
            if let Some(back) = record.document_image_back {
                self.store.dispatch(StateAction::SetDocumentBack(back));
            }
            if let Some(selfie) = record.selfie_image {
                self.store.dispatch(StateAction::SetSelfie(selfie));
            }
        }

        let facade = Arc::clone(&self.facade);
        tokio::spawn(async move {
            sweeper::sweep(&facade).await;
        });
        // the hold drops here, after the sweep has been kicked off
    }
}
