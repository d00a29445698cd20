//! Session glue for the veridraft draft cache.
//!
//! This crate connects the storage façade to a host application's
//! in-memory state:
//! - An action-dispatching state container with snapshot broadcast
//! - A one-shot restorer that rehydrates state on startup
//! - An auto-persist watcher that writes captures back through the façade
//! - A clear coordinator for submissions and full resets

pub mod clear;
pub mod restore;
pub mod selection;
pub mod state;
pub mod watcher;

pub use clear::ClearCoordinator;
pub use restore::{RestoreGate, SessionRestorer};
pub use selection::PersistedSelection;
pub use state::{SelectionField, StateAction, StateStore, VerificationState};
