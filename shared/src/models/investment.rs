use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text};
use crate::operations::{round_cents, ValidationError};
use crate::row::decimal;
use crate::schema::{Entity, EntityStatus, UpdateDiscipline};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Investment {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Free-form asset class (gold, certificate, stocks, ...)
    pub kind: String,
    #[serde(with = "decimal")]
    pub invested_amount: f64,
    #[serde(with = "decimal")]
    pub current_value: f64,
    #[serde(default)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investment {
    pub fn profit(&self) -> f64 {
        round_cents(self.current_value - self.invested_amount)
    }

    /// Return on investment as a percentage; zero when nothing was invested
    pub fn return_percentage(&self) -> f64 {
        if self.invested_amount == 0.0 {
            0.0
        } else {
            round_cents(self.profit() / self.invested_amount * 100.0)
        }
    }
}

impl Entity for Investment {
    const TABLE: &'static str = "investments";
    const DOMAIN: &'static str = "investment";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "kind",
        "invested_amount",
        "current_value",
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
        require_text(&self.kind, "kind")?;
        require_non_negative(self.invested_amount, "invested_amount")?;
        require_non_negative(self.current_value, "current_value")
    }
}
