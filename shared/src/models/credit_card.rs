use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text, BalanceHolder};
use crate::fees;
use crate::operations::{check_payment, BalanceFloor, ValidationError};
use crate::row::decimal;
use crate::schema::{Entity, EntityStatus, UpdateDiscipline};

/// A credit line. `balance` is signed: zero when settled, negative while the
/// card carries debt, positive after an allowed overpayment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditCard {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub card_number_last4: Option<String>,
    #[serde(with = "decimal")]
    pub credit_limit: f64,
    #[serde(with = "decimal")]
    pub balance: f64,
    #[serde(default)]
    pub allow_overpayment: bool,
    /// Cashback percentage earned on purchases
    #[serde(default, with = "decimal")]
    pub cashback_rate: f64,
    #[serde(default)]
    pub statement_day: Option<u8>,
    #[serde(default)]
    pub due_day: Option<u8>,
    #[serde(default)]
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditCard {
    pub fn outstanding(&self) -> f64 {
        fees::outstanding(self.balance)
    }

    pub fn available_credit(&self) -> f64 {
        fees::available_credit(self.credit_limit, self.balance)
    }

    pub fn utilization(&self) -> f64 {
        fees::utilization(self.credit_limit, self.balance)
    }
}

impl Entity for CreditCard {
    const TABLE: &'static str = "credit_cards";
    const DOMAIN: &'static str = "card";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "bank_name",
        "card_number_last4",
        "credit_limit",
        "balance",
        "allow_overpayment",
        "cashback_rate",
        "statement_day",
        "due_day",
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
        require_non_negative(self.credit_limit, "credit_limit")?;
        require_non_negative(self.cashback_rate, "cashback_rate")?;
        if let Some(last4) = &self.card_number_last4 {
            if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
                return Err(ValidationError::OutOfRange { field: "card_number_last4" });
            }
        }
        for (day, field) in [(self.statement_day, "statement_day"), (self.due_day, "due_day")] {
            if let Some(day) = day {
                if !(1..=31).contains(&day) {
                    return Err(ValidationError::OutOfRange { field });
                }
            }
        }
        if self.balance < BalanceFloor::NegativeLimit(self.credit_limit).value() {
            return Err(ValidationError::OutOfRange { field: "balance" });
        }
        Ok(())
    }
}

impl BalanceHolder for CreditCard {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> f64 {
        self.balance
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }

    fn floor(&self) -> BalanceFloor {
        BalanceFloor::NegativeLimit(self.credit_limit)
    }

    /// Cards are monitored on remaining credit, not on the signed balance
    fn monitored_value(&self) -> f64 {
        self.available_credit()
    }

    /// Money going onto a card is a payment against its debt
    fn check_credit(&self, amount: f64) -> Result<f64, ValidationError> {
        self.ensure_active()?;
        check_payment(self.balance, amount, self.allow_overpayment)
    }
}
