//! # Entity Models
//!
//! One typed record per backend table. Field names match the backend columns
//! exactly so that serialization produces the canonical row.
//!
//! Besides the per-table structs this module defines the capability traits the
//! services and hooks work against:
//!
//! - **BalanceHolder**: entities carrying a spendable balance (cards, accounts,
//!   vaults, wallets, POS machines)
//! - **UsageTracked**: entities with daily/monthly usage counters that reset on
//!   calendar boundaries

pub mod bank_account;
pub mod budget;
pub mod cash_vault;
pub mod cashback;
pub mod central_transfer;
pub mod credit_card;
pub mod customer;
pub mod e_wallet;
pub mod investment;
pub mod pos_machine;
pub mod prepaid_card;
pub mod reconciliation;
pub mod sale;
pub mod savings_circle;

pub use bank_account::BankAccount;
pub use budget::{Budget, BudgetPeriod};
pub use cash_vault::CashVault;
pub use cashback::CashbackRecord;
pub use central_transfer::CentralTransfer;
pub use credit_card::CreditCard;
pub use customer::Customer;
pub use e_wallet::EWallet;
pub use investment::Investment;
pub use pos_machine::PosMachine;
pub use prepaid_card::PrepaidCard;
pub use reconciliation::Reconciliation;
pub use sale::Sale;
pub use savings_circle::SavingsCircle;

use serde_json::{json, Value};

use crate::operations::{
    check_deposit, check_purchase, round_cents, BalanceFloor, UsageLimits, ValidationError,
};
use crate::row::Row;
use crate::schema::Entity;

/// Entities holding a balance that commands move money in and out of
pub trait BalanceHolder: Entity {
    fn display_name(&self) -> &str;

    fn balance(&self) -> f64;

    fn is_active(&self) -> bool;

    fn floor(&self) -> BalanceFloor {
        BalanceFloor::Zero
    }

    fn capacity(&self) -> Option<f64> {
        None
    }

    /// Value compared against low-balance thresholds
    fn monitored_value(&self) -> f64 {
        self.balance()
    }

    /// Per-entity low-balance threshold overriding the domain default
    fn alert_threshold(&self) -> Option<f64> {
        None
    }

    /// Spending caps a debit must respect, for entities that track usage
    fn usage_limits(&self) -> Option<UsageLimits> {
        None
    }

    fn ensure_active(&self) -> Result<(), ValidationError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ValidationError::Inactive(self.display_name().to_string()))
        }
    }

    /// Balance after taking `amount` out (purchase, withdrawal, transfer source)
    fn check_debit(&self, amount: f64) -> Result<f64, ValidationError> {
        self.ensure_active()?;
        if let Some(usage) = self.usage_limits() {
            usage.check(amount)?;
        }
        check_purchase(self.balance(), amount, self.floor())
    }

    /// Balance after putting `amount` in (deposit, recharge, transfer destination)
    fn check_credit(&self, amount: f64) -> Result<f64, ValidationError> {
        self.ensure_active()?;
        check_deposit(self.balance(), amount, self.capacity())
    }

    /// Partial update recording a debit, including usage counters where tracked
    fn debit_patch(&self, amount: f64) -> Result<Row, ValidationError> {
        let new_balance = self.check_debit(amount)?;
        let mut patch = balance_patch(new_balance);
        if let Some(usage) = self.usage_limits() {
            let daily = round_cents(usage.daily_used + amount);
            let monthly = round_cents(usage.monthly_used + amount);
            patch.insert("daily_used".to_string(), json!(daily));
            patch.insert("monthly_used".to_string(), json!(monthly));
        }
        Ok(patch)
    }

    fn credit_patch(&self, amount: f64) -> Result<Row, ValidationError> {
        self.check_credit(amount).map(balance_patch)
    }

    /// Partial update undoing an earlier `debit_patch(amount)`. Unlike a
    /// credit it skips the capacity and overpayment rules and gives the usage
    /// back to the counters.
    fn refund_patch(&self, amount: f64) -> Row {
        let mut patch = balance_patch(round_cents(self.balance() + amount));
        if let Some(usage) = self.usage_limits() {
            let daily = round_cents((usage.daily_used - amount).max(0.0));
            let monthly = round_cents((usage.monthly_used - amount).max(0.0));
            patch.insert("daily_used".to_string(), json!(daily));
            patch.insert("monthly_used".to_string(), json!(monthly));
        }
        patch
    }
}

/// Partial update setting only the balance column
pub fn balance_patch(balance: f64) -> Row {
    let mut patch = Row::new();
    patch.insert("balance".to_string(), Value::from(balance));
    patch
}

/// Entities with usage counters that reset at day and month boundaries
pub trait UsageTracked: Entity {
    fn usage(&self) -> UsageLimits;
}

pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(())
    }
}

pub(crate) fn require_non_negative(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field })
    }
}
