use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require_text;
use crate::operations::{round_cents, ValidationError};
use crate::row::decimal;
use crate::schema::{Entity, UpdateDiscipline};

/// A recorded comparison between the tracked balance of an entity and the
/// balance counted or reported by the bank
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reconciliation {
    pub id: String,
    pub user_id: String,
    /// Destination key (`<domain>-<id>`) of the reconciled entity
    pub source_key: String,
    #[serde(with = "decimal")]
    pub expected_balance: f64,
    #[serde(with = "decimal")]
    pub actual_balance: f64,
    #[serde(default)]
    pub notes: Option<String>,
    pub reconciled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reconciliation {
    /// Positive when more money was found than tracked
    pub fn difference(&self) -> f64 {
        round_cents(self.actual_balance - self.expected_balance)
    }

    pub fn is_balanced(&self) -> bool {
        self.difference() == 0.0
    }
}

impl Entity for Reconciliation {
    const TABLE: &'static str = "reconciliations";
    const DOMAIN: &'static str = "reconciliation";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "source_key",
        "expected_balance",
        "actual_balance",
        "notes",
        "reconciled_at",
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
        require_text(&self.source_key, "source_key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference() {
        let rec = Reconciliation {
            expected_balance: 1000.0,
            actual_balance: 990.5,
            ..Default::default()
        };
        assert_eq!(rec.difference(), -9.5);
        assert!(!rec.is_balanced());
    }
}
