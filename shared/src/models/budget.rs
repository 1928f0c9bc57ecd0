use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text};
use crate::operations::{round_cents, ValidationError};
use crate::row::decimal;
use crate::schema::{Entity, UpdateDiscipline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
}

/// Spending cap for one category over a period
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub category: String,
    #[serde(with = "decimal")]
    pub limit_amount: f64,
    #[serde(default, with = "decimal")]
    pub spent: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn remaining(&self) -> f64 {
        round_cents(self.limit_amount - self.spent)
    }

    pub fn is_exceeded(&self) -> bool {
        self.remaining() < 0.0
    }
}

impl Entity for Budget {
    const TABLE: &'static str = "budgets";
    const DOMAIN: &'static str = "budget";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "category",
        "limit_amount",
        "spent",
        "period",
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
        require_text(&self.category, "category")?;
        require_non_negative(self.limit_amount, "limit_amount")?;
        require_non_negative(self.spent, "spent")
    }
}
