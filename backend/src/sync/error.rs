use shared::{SchemaError, ValidationError};

use crate::storage::BackendError;

/// Errors surfaced by collection operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no signed-in user")]
    NoSession,
    #[error("{table} has no row {id}")]
    NotFound { table: &'static str, id: String },
    /// The session changed while the request was in flight; its result was dropped
    #[error("{table} was re-scoped before the request completed")]
    StaleScope { table: &'static str },
}
