//! Fee, cashback and credit-statement arithmetic.

use serde::{Deserialize, Serialize};

use crate::operations::round_cents;

/// How a fee is charged on an amount
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FeeRule {
    #[default]
    None,
    /// Percentage of the amount (2.5 = 2.5%)
    Percentage(f64),
    /// Flat amount regardless of size
    Fixed(f64),
}

impl FeeRule {
    pub fn fee_for(&self, amount: f64) -> f64 {
        let fee = match self {
            FeeRule::None => 0.0,
            FeeRule::Percentage(pct) => amount * pct / 100.0,
            FeeRule::Fixed(fee) => *fee,
        };
        round_cents(fee.max(0.0))
    }

    /// Amount plus its fee
    pub fn total_with_fee(&self, amount: f64) -> f64 {
        round_cents(amount + self.fee_for(amount))
    }
}

/// Cashback earned on a purchase at `rate` percent
pub fn cashback_for(amount: f64, rate: f64) -> f64 {
    if amount <= 0.0 || rate <= 0.0 {
        return 0.0;
    }
    round_cents(amount * rate / 100.0)
}

/// Amount owed on a signed credit balance
pub fn outstanding(balance: f64) -> f64 {
    crate::operations::outstanding(balance)
}

/// Credit still available on a card
pub fn available_credit(limit: f64, balance: f64) -> f64 {
    round_cents((limit + balance).max(0.0))
}

/// Share of the limit in use, as a percentage
pub fn utilization(limit: f64, balance: f64) -> f64 {
    if limit <= 0.0 {
        return 0.0;
    }
    round_cents(outstanding(balance) / limit * 100.0)
}

/// Minimum due on a statement: `percentage` of the outstanding amount, never
/// less than `minimum_amount`, never more than what is owed
pub fn minimum_payment(balance: f64, percentage: f64, minimum_amount: f64) -> f64 {
    let owed = outstanding(balance);
    let by_percentage = round_cents(owed * percentage / 100.0);
    by_percentage.max(minimum_amount).min(owed)
}
