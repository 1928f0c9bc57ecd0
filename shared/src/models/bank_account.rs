use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_text, BalanceHolder};
use crate::operations::ValidationError;
use crate::row::{decimal, optional_decimal};
use crate::schema::{Entity, EntityStatus, UpdateDiscipline};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankAccount {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub bank_name: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(with = "decimal")]
    pub balance: f64,
    /// Alert when the balance drops below this amount
    #[serde(default, with = "optional_decimal")]
    pub min_balance_alert: Option<f64>,
    #[serde(default)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for BankAccount {
    const TABLE: &'static str = "bank_accounts";
    const DOMAIN: &'static str = "bank";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "bank_name",
        "account_number",
        "balance",
        "min_balance_alert",
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
        require_text(&self.bank_name, "bank_name")
    }
}

impl BalanceHolder for BankAccount {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> f64 {
        self.balance
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }

    fn alert_threshold(&self) -> Option<f64> {
        self.min_balance_alert
    }
}
