//! # Low-Balance Alerts
//!
//! Watches the balance-holding collections and raises a warning notice when
//! an entity's monitored value drops below its threshold. Each entity alerts
//! at most once per cooldown window; the time of the last alert is kept in
//! the key/value store under `low_balance_notified:<domain>:<id>` so the
//! window survives restarts.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use shared::BalanceHolder;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::notices::{Notice, NoticeBus, NoticeLevel};
use crate::storage::{keys, KeyValueStore};
use crate::sync::SyncedCollection;
use crate::workspace::Workspace;

pub struct LowBalanceMonitor {
    kv: Arc<dyn KeyValueStore>,
    notices: NoticeBus,
    config: AppConfig,
}

impl LowBalanceMonitor {
    pub fn new(kv: Arc<dyn KeyValueStore>, notices: NoticeBus, config: AppConfig) -> Self {
        Self { kv, notices, config }
    }

    fn cooldown(&self) -> Duration {
        self.config.cooldown()
    }

    fn last_notified(&self, key: &str) -> Option<DateTime<Utc>> {
        let stored = self.kv.get(key)?;
        match DateTime::parse_from_rfc3339(&stored) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                warn!("Ignoring unreadable alert timestamp under {}: {}", key, e);
                None
            }
        }
    }

    /// Check `entities` as of `now`; publishes and returns the alerts raised
    pub fn check_at<E: BalanceHolder>(&self, now: DateTime<Utc>, entities: &[E]) -> Vec<Notice> {
        let mut raised = Vec::new();
        for entity in entities {
            if !entity.is_active() {
                continue;
            }
            let threshold = entity
                .alert_threshold()
                .or_else(|| self.config.threshold_for(E::DOMAIN));
            let Some(threshold) = threshold else {
                continue;
            };
            let value = entity.monitored_value();
            if value >= threshold {
                continue;
            }

            let key = keys::low_balance_notified(E::DOMAIN, entity.id());
            if let Some(last) = self.last_notified(&key) {
                if now - last < self.cooldown() {
                    debug!("Low balance on {} already reported at {}", key, last);
                    continue;
                }
            }

            let notice = Notice::new(
                NoticeLevel::Warning,
                "Low balance",
                format!("{} is at {:.2}, below {:.2}", entity.display_name(), value, threshold),
            )
            .with_entity(format!("{}-{}", E::DOMAIN, entity.id()));

            if let Err(e) = self.kv.set(&key, &now.to_rfc3339()) {
                warn!("Failed to remember low-balance alert for {}: {}", key, e);
            }
            self.notices.publish(notice.clone());
            raised.push(notice);
        }
        raised
    }

    fn check_collection<E: BalanceHolder>(
        &self,
        now: DateTime<Utc>,
        collection: &SyncedCollection<E>,
    ) -> Vec<Notice> {
        collection.with_items(|items| self.check_at(now, items))
    }

    /// Check every balance-holding collection in the workspace
    pub fn check_workspace(&self, workspace: &Workspace, now: DateTime<Utc>) -> Vec<Notice> {
        let mut raised = Vec::new();
        raised.extend(self.check_collection(now, &workspace.credit_cards));
        raised.extend(self.check_collection(now, &workspace.prepaid_cards));
        raised.extend(self.check_collection(now, &workspace.bank_accounts));
        raised.extend(self.check_collection(now, &workspace.cash_vaults));
        raised.extend(self.check_collection(now, &workspace.e_wallets));
        raised.extend(self.check_collection(now, &workspace.pos_machines));
        raised
    }
}
