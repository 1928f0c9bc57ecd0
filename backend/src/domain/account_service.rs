//! Deposits and withdrawals on balance holders.
//!
//! Each command checks the entity's rules locally (floor, capacity, usage
//! caps, active status) and then writes the new balance through the
//! entity's collection. A command that fails either step leaves the
//! collection as it was. Commands on one collection run one at a time, so
//! each check sees the balance the previous command left behind.

use log::info;
use shared::BalanceHolder;
use std::sync::Arc;

use super::destination::{DestinationKey, DestinationKind};
use super::error::CommandError;
use crate::sync::{SyncError, SyncedCollection};
use crate::workspace::Workspace;

fn current<E: BalanceHolder>(collection: &SyncedCollection<E>, id: &str) -> Result<E, SyncError> {
    collection.get(id).ok_or_else(|| SyncError::NotFound {
        table: E::TABLE,
        id: id.to_string(),
    })
}

/// Take `amount` out of the entity `id`
pub(crate) async fn debit<E: BalanceHolder>(
    collection: &SyncedCollection<E>,
    id: &str,
    amount: f64,
) -> Result<E, SyncError> {
    collection.modify(id, |current| Ok(current.debit_patch(amount)?)).await
}

/// Put `amount` into the entity `id`
pub(crate) async fn credit<E: BalanceHolder>(
    collection: &SyncedCollection<E>,
    id: &str,
    amount: f64,
) -> Result<E, SyncError> {
    collection.modify(id, |current| Ok(current.credit_patch(amount)?)).await
}

/// Give back an earlier debit of `amount`, usage counters included
pub(crate) async fn refund<E: BalanceHolder>(
    collection: &SyncedCollection<E>,
    id: &str,
    amount: f64,
) -> Result<E, SyncError> {
    collection.modify(id, |current| Ok(current.refund_patch(amount))).await
}

fn can_credit<E: BalanceHolder>(
    collection: &SyncedCollection<E>,
    id: &str,
    amount: f64,
) -> Result<(), SyncError> {
    current(collection, id)?.check_credit(amount)?;
    Ok(())
}

/// Balance of the destination after the command
pub(crate) async fn debit_key(
    workspace: &Workspace,
    key: &DestinationKey,
    amount: f64,
) -> Result<f64, SyncError> {
    let id = key.id.as_str();
    let balance = match key.kind {
        DestinationKind::CreditCard => debit(&workspace.credit_cards, id, amount).await?.balance(),
        DestinationKind::PrepaidCard => {
            debit(&workspace.prepaid_cards, id, amount).await?.balance()
        }
        DestinationKind::BankAccount => {
            debit(&workspace.bank_accounts, id, amount).await?.balance()
        }
        DestinationKind::CashVault => debit(&workspace.cash_vaults, id, amount).await?.balance(),
        DestinationKind::EWallet => debit(&workspace.e_wallets, id, amount).await?.balance(),
        DestinationKind::PosMachine => debit(&workspace.pos_machines, id, amount).await?.balance(),
    };
    Ok(balance)
}

pub(crate) async fn credit_key(
    workspace: &Workspace,
    key: &DestinationKey,
    amount: f64,
) -> Result<f64, SyncError> {
    let id = key.id.as_str();
    let balance = match key.kind {
        DestinationKind::CreditCard => credit(&workspace.credit_cards, id, amount).await?.balance(),
        DestinationKind::PrepaidCard => {
            credit(&workspace.prepaid_cards, id, amount).await?.balance()
        }
        DestinationKind::BankAccount => {
            credit(&workspace.bank_accounts, id, amount).await?.balance()
        }
        DestinationKind::CashVault => credit(&workspace.cash_vaults, id, amount).await?.balance(),
        DestinationKind::EWallet => credit(&workspace.e_wallets, id, amount).await?.balance(),
        DestinationKind::PosMachine => credit(&workspace.pos_machines, id, amount).await?.balance(),
    };
    Ok(balance)
}

pub(crate) async fn refund_key(
    workspace: &Workspace,
    key: &DestinationKey,
    amount: f64,
) -> Result<f64, SyncError> {
    let id = key.id.as_str();
    let balance = match key.kind {
        DestinationKind::CreditCard => refund(&workspace.credit_cards, id, amount).await?.balance(),
        DestinationKind::PrepaidCard => {
            refund(&workspace.prepaid_cards, id, amount).await?.balance()
        }
        DestinationKind::BankAccount => {
            refund(&workspace.bank_accounts, id, amount).await?.balance()
        }
        DestinationKind::CashVault => refund(&workspace.cash_vaults, id, amount).await?.balance(),
        DestinationKind::EWallet => refund(&workspace.e_wallets, id, amount).await?.balance(),
        DestinationKind::PosMachine => refund(&workspace.pos_machines, id, amount).await?.balance(),
    };
    Ok(balance)
}

/// Check a credit would be accepted, without writing anything
pub(crate) fn check_credit_key(
    workspace: &Workspace,
    key: &DestinationKey,
    amount: f64,
) -> Result<(), SyncError> {
    let id = key.id.as_str();
    match key.kind {
        DestinationKind::CreditCard => can_credit(&workspace.credit_cards, id, amount),
        DestinationKind::PrepaidCard => can_credit(&workspace.prepaid_cards, id, amount),
        DestinationKind::BankAccount => can_credit(&workspace.bank_accounts, id, amount),
        DestinationKind::CashVault => can_credit(&workspace.cash_vaults, id, amount),
        DestinationKind::EWallet => can_credit(&workspace.e_wallets, id, amount),
        DestinationKind::PosMachine => can_credit(&workspace.pos_machines, id, amount),
    }
}

pub(crate) fn parse_key(key: &str) -> Result<DestinationKey, CommandError> {
    DestinationKey::parse(key).ok_or_else(|| CommandError::UnknownDestination(key.to_string()))
}

/// Deposits and withdrawals addressed by destination key
#[derive(Clone)]
pub struct AccountService {
    workspace: Arc<Workspace>,
}

impl AccountService {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Returns the new balance
    pub async fn deposit(&self, key: &str, amount: f64) -> Result<f64, CommandError> {
        let key = parse_key(key)?;
        let balance = credit_key(&self.workspace, &key, amount).await?;
        info!("Deposited {:.2} into {} (balance {:.2})", amount, key, balance);
        Ok(balance)
    }

    /// Returns the new balance
    pub async fn withdraw(&self, key: &str, amount: f64) -> Result<f64, CommandError> {
        let key = parse_key(key)?;
        let balance = debit_key(&self.workspace, &key, amount).await?;
        info!("Withdrew {:.2} from {} (balance {:.2})", amount, key, balance);
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestWorkspace;
    use serde_json::json;
    use shared::ValidationError;

    async fn setup() -> (AccountService, Arc<Workspace>, String, String) {
        let test = TestWorkspace::new();
        let vault_id = test
            .seed("cash_vaults", json!({"name": "Safe", "balance": 900.0, "capacity": 1000.0}))
            .await;
        let bank_id = test
            .seed("bank_accounts", json!({"name": "Main", "bank_name": "CIB", "balance": 200.0}))
            .await;
        test.open().await;
        let workspace = Arc::new(test.workspace);
        (AccountService::new(workspace.clone()), workspace, vault_id, bank_id)
    }

    #[tokio::test]
    async fn test_deposit_respects_capacity() {
        let (service, workspace, vault_id, _) = setup().await;
        let key = format!("vault-{}", vault_id);

        let err = service.deposit(&key, 150.0).await.unwrap_err();
        assert!(matches!(err.validation(), Some(ValidationError::CapacityExceeded { .. })));
        assert_eq!(workspace.cash_vaults.get(&vault_id).unwrap().balance, 900.0);

        assert_eq!(service.deposit(&key, 100.0).await.unwrap(), 1000.0);
        assert_eq!(workspace.cash_vaults.get(&vault_id).unwrap().balance, 1000.0);
    }

    #[tokio::test]
    async fn test_withdraw_respects_floor() {
        let (service, workspace, _, bank_id) = setup().await;
        let key = format!("bank-{}", bank_id);

        let err = service.withdraw(&key, 250.0).await.unwrap_err();
        assert!(matches!(err.validation(), Some(ValidationError::InsufficientFunds { .. })));
        assert_eq!(workspace.bank_accounts.get(&bank_id).unwrap().balance, 200.0);

        assert_eq!(service.withdraw(&key, 200.0).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let (service, _, _, _) = setup().await;
        assert_eq!(
            service.deposit("budget-1", 10.0).await,
            Err(CommandError::UnknownDestination("budget-1".to_string()))
        );
        assert!(matches!(
            service.deposit("bank-missing", 10.0).await,
            Err(CommandError::Sync(SyncError::NotFound { .. }))
        ));
    }
}
