use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text};
use crate::operations::{validate_amount, ValidationError};
use crate::row::decimal;
use crate::schema::{Entity, UpdateDiscipline};

/// Money moved between two tracked entities, addressed by destination keys
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CentralTransfer {
    pub id: String,
    pub user_id: String,
    pub source_key: String,
    pub destination_key: String,
    #[serde(with = "decimal")]
    pub amount: f64,
    #[serde(default, with = "decimal")]
    pub fee: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CentralTransfer {
    const TABLE: &'static str = "central_transfers";
    const DOMAIN: &'static str = "transfer";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "source_key",
        "destination_key",
        "amount",
        "fee",
        "description",
        "created_at",
        "updated_at",
    ];
    const UPDATE_DISCIPLINE: UpdateDiscipline = UpdateDiscipline::OnAck;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.source_key, "source_key")?;
        require_text(&self.destination_key, "destination_key")?;
        if self.source_key == self.destination_key {
            return Err(ValidationError::SameEndpoints);
        }
        validate_amount(self.amount)?;
        require_non_negative(self.fee, "fee")
    }
}
