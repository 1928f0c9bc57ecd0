use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::require_text;
use crate::operations::{validate_amount, ValidationError};
use crate::row::decimal;
use crate::schema::{Entity, UpdateDiscipline};

/// Cashback earned on a credit card purchase
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CashbackRecord {
    pub id: String,
    pub user_id: String,
    pub card_id: String,
    #[serde(with = "decimal")]
    pub amount: f64,
    pub earned_on: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CashbackRecord {
    const TABLE: &'static str = "cashback_records";
    const DOMAIN: &'static str = "cashback";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "card_id",
        "amount",
        "earned_on",
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
        require_text(&self.card_id, "card_id")?;
        validate_amount(self.amount).map(|_| ())
    }
}
