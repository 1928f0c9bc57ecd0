use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text, BalanceHolder};
use crate::operations::ValidationError;
use crate::row::{decimal, optional_decimal};
use crate::schema::{Entity, EntityStatus, UpdateDiscipline};

/// Physical cash storage (safe, drawer, branch till)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CashVault {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(with = "decimal")]
    pub balance: f64,
    /// Maximum amount the vault may hold
    #[serde(default, with = "optional_decimal")]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CashVault {
    const TABLE: &'static str = "cash_vaults";
    const DOMAIN: &'static str = "vault";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "location",
        "balance",
        "capacity",
        "status",
        "created_at",
        "updated_at",
    ];
    const UPDATE_DISCIPLINE: UpdateDiscipline = UpdateDiscipline::Optimistic;

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
        require_non_negative(self.balance, "balance")?;
        if let Some(capacity) = self.capacity {
            require_non_negative(capacity, "capacity")?;
            if self.balance > capacity {
                return Err(ValidationError::OutOfRange { field: "balance" });
            }
        }
        Ok(())
    }
}

impl BalanceHolder for CashVault {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> f64 {
        self.balance
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }

    fn capacity(&self) -> Option<f64> {
        self.capacity
    }
}
