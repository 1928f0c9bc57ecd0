use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text, BalanceHolder, UsageTracked};
use crate::operations::{UsageLimits, ValidationError};
use crate::row::{decimal, optional_decimal};
use crate::schema::{Entity, EntityStatus, UpdateDiscipline};

/// A stored-value card. The balance can never go below zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrepaidCard {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(with = "decimal")]
    pub balance: f64,
    #[serde(default, with = "optional_decimal")]
    pub daily_limit: Option<f64>,
    #[serde(default, with = "optional_decimal")]
    pub monthly_limit: Option<f64>,
    #[serde(default, with = "decimal")]
    pub daily_used: f64,
    #[serde(default, with = "decimal")]
    pub monthly_used: f64,
    #[serde(default)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for PrepaidCard {
    const TABLE: &'static str = "prepaid_cards";
    const DOMAIN: &'static str = "prepaid";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "provider",
        "balance",
        "daily_limit",
        "monthly_limit",
        "daily_used",
        "monthly_used",
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
        require_non_negative(self.balance, "balance")?;
        require_non_negative(self.daily_used, "daily_used")?;
        require_non_negative(self.monthly_used, "monthly_used")?;
        if let Some(limit) = self.daily_limit {
            require_non_negative(limit, "daily_limit")?;
        }
        if let Some(limit) = self.monthly_limit {
            require_non_negative(limit, "monthly_limit")?;
        }
        Ok(())
    }
}

impl BalanceHolder for PrepaidCard {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> f64 {
        self.balance
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }

    fn usage_limits(&self) -> Option<UsageLimits> {
        Some(self.usage())
    }
}

impl UsageTracked for PrepaidCard {
    fn usage(&self) -> UsageLimits {
        UsageLimits {
            daily_used: self.daily_used,
            monthly_used: self.monthly_used,
            daily_limit: self.daily_limit,
            monthly_limit: self.monthly_limit,
        }
    }
}
