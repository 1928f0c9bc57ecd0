use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require_non_negative;
use crate::operations::{round_cents, validate_amount, ValidationError};
use crate::row::decimal;
use crate::schema::{Entity, UpdateDiscipline};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sale {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(with = "decimal")]
    pub amount: f64,
    #[serde(default, with = "decimal")]
    pub cost: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub sold_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn profit(&self) -> f64 {
        round_cents(self.amount - self.cost)
    }
}

impl Entity for Sale {
    const TABLE: &'static str = "sales";
    const DOMAIN: &'static str = "sale";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "customer_id",
        "amount",
        "cost",
        "description",
        "sold_at",
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
        validate_amount(self.amount)?;
        require_non_negative(self.cost, "cost")
    }
}
