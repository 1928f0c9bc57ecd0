//! # Sync Module
//!
//! Per-table collections mirrored from the backend and kept current through
//! its change stream. See `collection` for the lifecycle.

pub mod collection;
pub mod error;
mod merge;

pub use collection::{ManagedCollection, SyncedCollection};
pub use error::SyncError;
