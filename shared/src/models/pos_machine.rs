use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text, BalanceHolder};
use crate::operations::ValidationError;
use crate::row::decimal;
use crate::schema::{Entity, EntityStatus, UpdateDiscipline};

/// Card terminal; `balance` is the settled amount not yet withdrawn
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PosMachine {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(with = "decimal")]
    pub balance: f64,
    /// Acquirer commission taken from every settled sale
    #[serde(default, with = "decimal")]
    pub fee_percentage: f64,
    #[serde(default)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for PosMachine {
    const TABLE: &'static str = "pos_machines";
    const DOMAIN: &'static str = "pos";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "provider",
        "location",
        "balance",
        "fee_percentage",
        "status",
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
        require_text(&self.name, "name")?;
        require_non_negative(self.fee_percentage, "fee_percentage")?;
        if self.fee_percentage > 100.0 {
            return Err(ValidationError::OutOfRange { field: "fee_percentage" });
        }
        Ok(())
    }
}

impl BalanceHolder for PosMachine {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> f64 {
        self.balance
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
