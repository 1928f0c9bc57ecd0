use shared::ValidationError;

use crate::sync::SyncError;

/// Why a money-moving command did not go through
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown destination: {0}")]
    UnknownDestination(String),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl From<ValidationError> for CommandError {
    fn from(err: ValidationError) -> Self {
        CommandError::Sync(SyncError::Validation(err))
    }
}

impl CommandError {
    /// The local rule that blocked the command, if that is what happened
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            CommandError::Sync(SyncError::Validation(err)) => Some(err),
            _ => None,
        }
    }
}
