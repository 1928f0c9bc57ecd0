//! # Workspace
//!
//! The per-session bundle every domain service works against: one
//! synchronized collection per table plus the key/value store, the notice
//! bus and the configuration. Constructed once and passed around behind an
//! `Arc`.

use log::{info, warn};
use shared::{
    BankAccount, Budget, CashVault, CashbackRecord, CentralTransfer, CreditCard, Customer, EWallet,
    Investment, PosMachine, PrepaidCard, Reconciliation, Sale, SavingsCircle,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::notices::NoticeBus;
use crate::session::Session;
use crate::storage::{KeyValueStore, RemoteTable};
use crate::sync::{ManagedCollection, SyncError, SyncedCollection};

pub struct Workspace {
    pub credit_cards: SyncedCollection<CreditCard>,
    pub prepaid_cards: SyncedCollection<PrepaidCard>,
    pub bank_accounts: SyncedCollection<BankAccount>,
    pub cash_vaults: SyncedCollection<CashVault>,
    pub e_wallets: SyncedCollection<EWallet>,
    pub pos_machines: SyncedCollection<PosMachine>,
    pub customers: SyncedCollection<Customer>,
    pub investments: SyncedCollection<Investment>,
    pub cashback: SyncedCollection<CashbackRecord>,
    pub reconciliations: SyncedCollection<Reconciliation>,
    pub sales: SyncedCollection<Sale>,
    pub savings_circles: SyncedCollection<SavingsCircle>,
    pub transfers: SyncedCollection<CentralTransfer>,
    pub budgets: SyncedCollection<Budget>,
    kv: Arc<dyn KeyValueStore>,
    notices: NoticeBus,
    config: AppConfig,
}

/// Outcome of opening every collection for a user
#[derive(Debug, Default)]
pub struct OpenReport {
    pub loaded: Vec<(&'static str, usize)>,
    pub failed: Vec<(&'static str, SyncError)>,
}

impl OpenReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Workspace {
    pub fn new(
        remote: Arc<dyn RemoteTable>,
        kv: Arc<dyn KeyValueStore>,
        notices: NoticeBus,
        config: AppConfig,
    ) -> Self {
        Self {
            credit_cards: SyncedCollection::new(remote.clone(), notices.clone()),
            prepaid_cards: SyncedCollection::new(remote.clone(), notices.clone()),
            bank_accounts: SyncedCollection::new(remote.clone(), notices.clone()),
            cash_vaults: SyncedCollection::new(remote.clone(), notices.clone()),
            e_wallets: SyncedCollection::new(remote.clone(), notices.clone()),
            pos_machines: SyncedCollection::new(remote.clone(), notices.clone()),
            customers: SyncedCollection::new(remote.clone(), notices.clone()),
            investments: SyncedCollection::new(remote.clone(), notices.clone()),
            cashback: SyncedCollection::new(remote.clone(), notices.clone()),
            reconciliations: SyncedCollection::new(remote.clone(), notices.clone()),
            sales: SyncedCollection::new(remote.clone(), notices.clone()),
            savings_circles: SyncedCollection::new(remote.clone(), notices.clone()),
            transfers: SyncedCollection::new(remote.clone(), notices.clone()),
            budgets: SyncedCollection::new(remote.clone(), notices.clone()),
            kv,
            notices,
            config,
        }
    }

    pub fn kv(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    pub fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The user every collection is currently scoped to
    pub fn owner(&self) -> Option<String> {
        self.bank_accounts.owner()
    }

    fn collections(&self) -> [&dyn ManagedCollection; 14] {
        [
            &self.credit_cards,
            &self.prepaid_cards,
            &self.bank_accounts,
            &self.cash_vaults,
            &self.e_wallets,
            &self.pos_machines,
            &self.customers,
            &self.investments,
            &self.cashback,
            &self.reconciliations,
            &self.sales,
            &self.savings_circles,
            &self.transfers,
            &self.budgets,
        ]
    }

    /// Scope every collection to `owner`, subscribe and load. A failing table
    /// does not stop the others.
    pub async fn open(&self, owner: &str) -> OpenReport {
        info!("Opening workspace for {}", owner);
        let mut report = OpenReport::default();
        for collection in self.collections() {
            match collection.open(owner).await {
                Ok(count) => report.loaded.push((collection.table(), count)),
                Err(e) => {
                    warn!("Could not open {}: {}", collection.table(), e);
                    report.failed.push((collection.table(), e));
                }
            }
        }
        report
    }

    pub async fn close(&self) {
        for collection in self.collections() {
            collection.close().await;
        }
        info!("Workspace closed");
    }

    /// Re-scope to the given session, or close when signed out
    pub async fn apply_session(&self, session: Option<&Session>) -> Option<OpenReport> {
        match session {
            Some(session) if self.owner().as_deref() == Some(session.user_id.as_str()) => None,
            Some(session) => Some(self.open(&session.user_id).await),
            None => {
                if self.owner().is_some() {
                    self.close().await;
                }
                None
            }
        }
    }

    /// Follow session changes until the sender goes away
    pub fn follow_session(
        self: Arc<Self>,
        mut sessions: watch::Receiver<Option<Session>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let session = sessions.borrow_and_update().clone();
                self.apply_session(session.as_ref()).await;
                if sessions.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
