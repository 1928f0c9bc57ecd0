use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require_text;
use crate::operations::{round_cents, validate_amount, ValidationError};
use crate::row::{count, decimal};
use crate::schema::{Entity, EntityStatus, UpdateDiscipline};

/// A rotating savings group: every member pays `monthly_amount` each round and
/// one member collects the pot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SavingsCircle {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(with = "decimal")]
    pub monthly_amount: f64,
    #[serde(with = "count")]
    pub member_count: u32,
    #[serde(with = "count")]
    pub current_round: u32,
    /// Round in which this user collects the pot
    #[serde(default)]
    pub my_turn: Option<u32>,
    #[serde(default)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavingsCircle {
    pub fn payout(&self) -> f64 {
        round_cents(self.monthly_amount * self.member_count as f64)
    }

    pub fn rounds_remaining(&self) -> u32 {
        self.member_count.saturating_sub(self.current_round)
    }
}

impl Entity for SavingsCircle {
    const TABLE: &'static str = "savings_circles";
    const DOMAIN: &'static str = "circle";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "monthly_amount",
        "member_count",
        "current_round",
        "my_turn",
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
        validate_amount(self.monthly_amount)?;
        if self.member_count == 0 {
            return Err(ValidationError::OutOfRange { field: "member_count" });
        }
        if self.current_round > self.member_count {
            return Err(ValidationError::OutOfRange { field: "current_round" });
        }
        if let Some(turn) = self.my_turn {
            if turn == 0 || turn > self.member_count {
                return Err(ValidationError::OutOfRange { field: "my_turn" });
            }
        }
        Ok(())
    }
}
