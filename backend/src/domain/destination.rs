//! # Destination Resolver
//!
//! Money-moving screens address balances by a single string key,
//! `<domain>-<id>` (`bank-6f1c...`, `wallet-42`). This module parses those keys
//! and looks them up across the balance-holding collections. Ids may contain
//! dashes themselves, so the key is split at the first dash only.

use serde::{Deserialize, Serialize};
use shared::{
    BalanceHolder, BankAccount, CashVault, CreditCard, EWallet, Entity, PosMachine, PrepaidCard,
};
use std::fmt;

use crate::sync::SyncedCollection;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    CreditCard,
    PrepaidCard,
    BankAccount,
    CashVault,
    EWallet,
    PosMachine,
}

impl DestinationKind {
    pub const ALL: [DestinationKind; 6] = [
        DestinationKind::CreditCard,
        DestinationKind::PrepaidCard,
        DestinationKind::BankAccount,
        DestinationKind::CashVault,
        DestinationKind::EWallet,
        DestinationKind::PosMachine,
    ];

    pub fn domain(self) -> &'static str {
        match self {
            DestinationKind::CreditCard => CreditCard::DOMAIN,
            DestinationKind::PrepaidCard => PrepaidCard::DOMAIN,
            DestinationKind::BankAccount => BankAccount::DOMAIN,
            DestinationKind::CashVault => CashVault::DOMAIN,
            DestinationKind::EWallet => EWallet::DOMAIN,
            DestinationKind::PosMachine => PosMachine::DOMAIN,
        }
    }

    pub fn from_domain(domain: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.domain() == domain)
    }
}

/// A parsed `<domain>-<id>` key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey {
    pub kind: DestinationKind,
    pub id: String,
}

impl DestinationKey {
    pub fn new(kind: DestinationKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn parse(key: &str) -> Option<Self> {
        let (domain, id) = key.split_once('-')?;
        if id.is_empty() {
            return None;
        }
        let kind = DestinationKind::from_domain(domain)?;
        Some(Self::new(kind, id))
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.domain(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationSummary {
    pub kind: DestinationKind,
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub is_active: bool,
}

impl DestinationSummary {
    pub fn key(&self) -> String {
        DestinationKey::new(self.kind, self.id.clone()).to_string()
    }
}

fn summarize<E: BalanceHolder>(kind: DestinationKind, entity: &E) -> DestinationSummary {
    DestinationSummary {
        kind,
        id: entity.id().to_string(),
        name: entity.display_name().to_string(),
        balance: entity.balance(),
        is_active: entity.is_active(),
    }
}

fn lookup<E: BalanceHolder>(
    collection: &SyncedCollection<E>,
    kind: DestinationKind,
    id: &str,
) -> Option<DestinationSummary> {
    collection.with_items(|items| {
        items
            .iter()
            .find(|item| item.id() == id)
            .map(|item| summarize(kind, item))
    })
}

fn list<E: BalanceHolder>(
    collection: &SyncedCollection<E>,
    kind: DestinationKind,
) -> Vec<DestinationSummary> {
    collection.with_items(|items| items.iter().map(|item| summarize(kind, item)).collect())
}

/// Look up a parsed key in the matching collection
pub fn resolve_key(workspace: &Workspace, key: &DestinationKey) -> Option<DestinationSummary> {
    let id = key.id.as_str();
    match key.kind {
        DestinationKind::CreditCard => lookup(&workspace.credit_cards, key.kind, id),
        DestinationKind::PrepaidCard => lookup(&workspace.prepaid_cards, key.kind, id),
        DestinationKind::BankAccount => lookup(&workspace.bank_accounts, key.kind, id),
        DestinationKind::CashVault => lookup(&workspace.cash_vaults, key.kind, id),
        DestinationKind::EWallet => lookup(&workspace.e_wallets, key.kind, id),
        DestinationKind::PosMachine => lookup(&workspace.pos_machines, key.kind, id),
    }
}

/// Resolve a `<domain>-<id>` key. Unknown domains, malformed keys and ids
/// not present in the collection all resolve to `None`.
pub fn resolve(workspace: &Workspace, key: &str) -> Option<DestinationSummary> {
    resolve_key(workspace, &DestinationKey::parse(key)?)
}

/// Every balance holder in the workspace, grouped by kind, for pickers
pub fn list_destinations(workspace: &Workspace, active_only: bool) -> Vec<DestinationSummary> {
    let mut destinations = Vec::new();
    destinations.extend(list(&workspace.credit_cards, DestinationKind::CreditCard));
    destinations.extend(list(&workspace.prepaid_cards, DestinationKind::PrepaidCard));
    destinations.extend(list(&workspace.bank_accounts, DestinationKind::BankAccount));
    destinations.extend(list(&workspace.cash_vaults, DestinationKind::CashVault));
    destinations.extend(list(&workspace.e_wallets, DestinationKind::EWallet));
    destinations.extend(list(&workspace.pos_machines, DestinationKind::PosMachine));
    if active_only {
        destinations.retain(|d| d.is_active);
    }
    destinations
}
