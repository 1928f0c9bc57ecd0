//! Change notifications delivered by the backend's push channel.

use serde::{Deserialize, Serialize};

use crate::row::Row;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeEvent {
    Insert { row: Row },
    Update { row: Row },
    Delete { id: String },
}
