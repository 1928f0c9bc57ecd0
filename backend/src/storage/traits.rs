//! # Storage Traits
//!
//! The seams between the state layer and the outside world: the hosted table
//! service (`RemoteTable`) and durable client-side key/value storage
//! (`KeyValueStore`). Domain code only ever sees these traits, so the same
//! collections run against the in-memory backend in tests and the file-backed
//! one on disk.

use async_trait::async_trait;
use shared::{ChangeEvent, Row};
use tokio::sync::mpsc;

/// Failures reported by a backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("row {id} not found in {table}")]
    NotFound { table: String, id: String },
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Push channel delivering change events for one `(table, owner)` scope.
/// Dropping the stream closes the subscription.
pub struct ChangeStream {
    receiver: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeStream {
    pub fn new(receiver: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event; `None` once the backend closed the channel
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// Row-level access to the hosted tables, always scoped by owner
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// All rows of `table` owned by `owner`, in insertion order
    async fn select_owned(&self, table: &str, owner: &str) -> Result<Vec<Row>, BackendError>;

    /// Insert a row for `owner`; returns the stored row with `id` and timestamps assigned
    async fn insert(&self, table: &str, owner: &str, row: Row) -> Result<Row, BackendError>;

    /// Partial update by id; returns the full stored row
    async fn update(
        &self,
        table: &str,
        owner: &str,
        id: &str,
        patch: Row,
    ) -> Result<Row, BackendError>;

    async fn delete(&self, table: &str, owner: &str, id: &str) -> Result<(), BackendError>;

    /// Open a change stream filtered to `owner`'s rows of `table`
    async fn subscribe(&self, table: &str, owner: &str) -> Result<ChangeStream, BackendError>;
}

/// Durable string key/value storage (theme, toggles, notification bookkeeping)
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    fn remove(&self, key: &str) -> anyhow::Result<()>;
}
