//! Core storage subsystem for veridraft.
//!
//! This crate provides:
//! - The tiered draft store (SQLite, durable key-value file, process memory)
//! - The cache façade with its fallback chain and clear-flag surface
//! - Cache key derivation, the expiry sweep, configuration, and error types

pub mod config;
pub mod error;
pub mod facade;
pub mod keys;
pub mod record;
pub mod store;
pub mod sweeper;

pub use config::CacheConfig;
pub use error::Error;
pub use facade::CacheFacade;
pub use record::{CachedVerificationRecord, RecordPatch};
