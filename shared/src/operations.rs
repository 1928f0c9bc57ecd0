//! Balance rules applied before any money-moving command leaves the client.
//!
//! All checks are pure: they take the current figures and the requested
//! amount and either return the resulting balance or the reason the command
//! must be blocked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance for comparing currency amounts held as floats
const EPSILON: f64 = 0.000_1;

/// Round to whole cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    Daily,
    Monthly,
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsagePeriod::Daily => write!(f, "daily"),
            UsagePeriod::Monthly => write!(f, "monthly"),
        }
    }
}

/// Reasons a command is blocked locally, before any network round trip
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} is out of range")]
    OutOfRange { field: &'static str },
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("insufficient funds: balance {balance:.2} cannot cover {amount:.2} (floor {floor:.2})")]
    InsufficientFunds { balance: f64, amount: f64, floor: f64 },
    #[error("payment of {amount:.2} exceeds outstanding balance {outstanding:.2}")]
    Overpayment { amount: f64, outstanding: f64 },
    #[error("deposit of {amount:.2} exceeds remaining capacity {remaining:.2}")]
    CapacityExceeded { amount: f64, remaining: f64 },
    #[error("{period} limit of {limit:.2} exceeded (used {used:.2}, requested {amount:.2})")]
    UsageLimitExceeded {
        period: UsagePeriod,
        limit: f64,
        used: f64,
        amount: f64,
    },
    #[error("{0} is not active")]
    Inactive(String),
    #[error("source and destination must differ")]
    SameEndpoints,
}

/// Lowest balance an entity may reach through a purchase or withdrawal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceFloor {
    Zero,
    /// Credit lines may go as low as the negative of their limit
    NegativeLimit(f64),
}

impl BalanceFloor {
    pub fn value(&self) -> f64 {
        match self {
            BalanceFloor::Zero => 0.0,
            BalanceFloor::NegativeLimit(limit) => -limit.abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceOp {
    Purchase(f64),
    Payment(f64),
    Deposit(f64),
    Withdrawal(f64),
}

/// Balance after applying an operation, without any rule checks
pub fn balance_after(balance: f64, op: BalanceOp) -> f64 {
    let result = match op {
        BalanceOp::Purchase(amount) | BalanceOp::Withdrawal(amount) => balance - amount,
        BalanceOp::Payment(amount) | BalanceOp::Deposit(amount) => balance + amount,
    };
    round_cents(result)
}

/// Amounts entering a command must be finite and strictly positive
pub fn validate_amount(amount: f64) -> Result<f64, ValidationError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(ValidationError::InvalidAmount)
    }
}

/// Returns the post-purchase balance, or an error if it would fall below `floor`
pub fn check_purchase(
    balance: f64,
    amount: f64,
    floor: BalanceFloor,
) -> Result<f64, ValidationError> {
    let amount = validate_amount(amount)?;
    let new_balance = balance_after(balance, BalanceOp::Purchase(amount));
    if new_balance < floor.value() - EPSILON {
        return Err(ValidationError::InsufficientFunds {
            balance,
            amount,
            floor: floor.value(),
        });
    }
    Ok(new_balance)
}

/// Amount still owed on a signed balance (negative balance = debt)
pub fn outstanding(balance: f64) -> f64 {
    if balance < 0.0 {
        round_cents(-balance)
    } else {
        0.0
    }
}

/// Returns the post-payment balance. Payments may not exceed what is owed
/// unless overpayment is allowed.
pub fn check_payment(
    balance: f64,
    amount: f64,
    allow_overpayment: bool,
) -> Result<f64, ValidationError> {
    let amount = validate_amount(amount)?;
    let owed = outstanding(balance);
    if !allow_overpayment && amount > owed + EPSILON {
        return Err(ValidationError::Overpayment {
            amount,
            outstanding: owed,
        });
    }
    Ok(balance_after(balance, BalanceOp::Payment(amount)))
}

/// Returns the post-deposit balance, honoring an optional capacity
pub fn check_deposit(
    balance: f64,
    amount: f64,
    capacity: Option<f64>,
) -> Result<f64, ValidationError> {
    let amount = validate_amount(amount)?;
    let new_balance = balance_after(balance, BalanceOp::Deposit(amount));
    if let Some(capacity) = capacity {
        if new_balance > capacity + EPSILON {
            return Err(ValidationError::CapacityExceeded {
                amount,
                remaining: round_cents((capacity - balance).max(0.0)),
            });
        }
    }
    Ok(new_balance)
}

/// Usage counters and their optional caps for one entity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsageLimits {
    pub daily_used: f64,
    pub monthly_used: f64,
    pub daily_limit: Option<f64>,
    pub monthly_limit: Option<f64>,
}

impl UsageLimits {
    /// Check that spending `amount` stays within both caps
    pub fn check(&self, amount: f64) -> Result<(), ValidationError> {
        let amount = validate_amount(amount)?;
        let periods = [
            (UsagePeriod::Daily, self.daily_used, self.daily_limit),
            (UsagePeriod::Monthly, self.monthly_used, self.monthly_limit),
        ];
        for (period, used, limit) in periods {
            if let Some(limit) = limit {
                if used + amount > limit + EPSILON {
                    return Err(ValidationError::UsageLimitExceeded {
                        period,
                        limit,
                        used,
                        amount,
                    });
                }
            }
        }
        Ok(())
    }
}
