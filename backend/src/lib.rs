//! # Finance Tracker Backend
//!
//! The domain state layer of the finance tracker dashboard. Every domain
//! (cards, accounts, vaults, wallets, sales, ...) is mirrored from its backend
//! table into a synchronized in-memory collection, scoped to the signed-in
//! user and kept current through the backend's change stream.
//!
//! ## Architecture
//!
//! ```text
//! UI observers (notices, collection snapshots)
//!     ↓
//! Domain (services, alerts, usage resets, destination resolver)
//!     ↓
//! Workspace (one SyncedCollection per table, session scoping)
//!     ↓
//! Storage (RemoteTable backends, key/value store)
//! ```
//!
//! Pure types, transforms and balance rules live in the `shared` crate.

pub mod config;
pub mod domain;
pub mod notices;
pub mod session;
pub mod storage;
pub mod sync;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_utils;

use anyhow::Result;
use log::info;
use std::sync::Arc;

pub use config::AppConfig;
pub use domain::*;
pub use notices::{Notice, NoticeBus, NoticeLevel};
pub use session::{Session, SessionManager};
pub use sync::{SyncError, SyncedCollection};
pub use workspace::{OpenReport, Workspace};

use storage::{CsvBackend, CsvConnection, KeyValueStore, RemoteTable, YamlKeyValueStore};

/// Everything the application needs, wired together
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub notices: NoticeBus,
    pub sessions: Arc<SessionManager>,
    pub workspace: Arc<Workspace>,
    pub accounts: AccountService,
    pub credit_cards: CreditCardService,
    pub prepaid_cards: PrepaidCardService,
    pub transfers: TransferService,
    pub low_balance: Arc<LowBalanceMonitor>,
    pub usage_reset: Arc<UsageResetScheduler>,
}

impl AppState {
    /// Wire the services around an already constructed remote and store
    pub fn new(
        config: AppConfig,
        remote: Arc<dyn RemoteTable>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        let notices = NoticeBus::new();
        let sessions = Arc::new(SessionManager::new(kv.clone(), config.auth.clone()));
        let workspace = Arc::new(Workspace::new(
            remote,
            kv.clone(),
            notices.clone(),
            config.clone(),
        ));

        Self {
            accounts: AccountService::new(workspace.clone()),
            credit_cards: CreditCardService::new(workspace.clone()),
            prepaid_cards: PrepaidCardService::new(workspace.clone()),
            transfers: TransferService::new(workspace.clone()),
            low_balance: Arc::new(LowBalanceMonitor::new(kv, notices.clone(), config.clone())),
            usage_reset: Arc::new(UsageResetScheduler::new(workspace.clone())),
            config,
            notices,
            sessions,
            workspace,
        }
    }
}

/// Initialize the backend over the file-backed stores in the configured
/// data directory
pub fn initialize_backend(config: AppConfig) -> Result<AppState> {
    info!("Setting up data directory {:?}", config.data_directory);
    let connection = CsvConnection::new(&config.data_directory)?;
    let remote: Arc<dyn RemoteTable> = Arc::new(CsvBackend::new(connection));

    info!("Opening settings store");
    let kv: Arc<dyn KeyValueStore> = Arc::new(YamlKeyValueStore::open(config.kv_path())?);

    info!("Setting up application state");
    Ok(AppState::new(config, remote, kv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::BankAccount;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_backed_state_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig {
            data_directory: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let state = initialize_backend(config.clone()).unwrap();
        state.sessions.sign_in(Session::new("user-1"));
        let report = state.workspace.open("user-1").await;
        assert!(report.is_complete());

        let account = state
            .workspace
            .bank_accounts
            .create(BankAccount {
                name: "Main".to_string(),
                bank_name: "CIB".to_string(),
                balance: 300.0,
                ..Default::default()
            })
            .await
            .unwrap();
        let balance = state
            .accounts
            .withdraw(&format!("bank-{}", account.id), 120.0)
            .await
            .unwrap();
        assert_eq!(balance, 180.0);
        state.workspace.close().await;
        assert!(temp_dir.path().join("bank_accounts.csv").exists());

        // A fresh state over the same directory sees the persisted balance
        let reopened = initialize_backend(config).unwrap();
        reopened.workspace.open("user-1").await;
        assert_eq!(reopened.workspace.bank_accounts.get(&account.id).unwrap().balance, 180.0);
    }
}
