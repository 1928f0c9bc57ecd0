//! # Usage Resets
//!
//! Prepaid cards and e-wallets count spending per day and per month. When the
//! local calendar day (or month) changes, the counters go back to zero. The
//! last period that was reset is stored per user under
//! `usage_reset:daily:<owner>` (`YYYY-MM-DD`) and
//! `usage_reset:monthly:<owner>` (`YYYY-MM`), so a restart in the same period
//! does not reset twice. A user seen for the first time only gets the marker
//! for the current period; counters already in use today are left alone.

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use serde_json::Value;
use shared::{Row, UsagePeriod, UsageTracked};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::notices::{Notice, NoticeLevel};
use crate::storage::keys;
use crate::sync::{SyncError, SyncedCollection};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetReport {
    /// Entities whose daily counter was reset
    pub daily: usize,
    /// Entities whose monthly counter was reset
    pub monthly: usize,
}

fn period_key(period: UsagePeriod, owner: &str) -> String {
    keys::usage_reset(&period.to_string(), owner)
}

fn period_label(period: UsagePeriod, today: NaiveDate) -> String {
    match period {
        UsagePeriod::Daily => today.format("%Y-%m-%d").to_string(),
        UsagePeriod::Monthly => today.format("%Y-%m").to_string(),
    }
}

fn counter_column(period: UsagePeriod) -> &'static str {
    match period {
        UsagePeriod::Daily => "daily_used",
        UsagePeriod::Monthly => "monthly_used",
    }
}

/// Zero the `period` counter on every entity that has used anything
async fn reset_collection<E: UsageTracked>(
    collection: &SyncedCollection<E>,
    period: UsagePeriod,
) -> Result<usize, SyncError> {
    let used: Vec<String> = collection.with_items(|items| {
        items
            .iter()
            .filter(|item| {
                let usage = item.usage();
                match period {
                    UsagePeriod::Daily => usage.daily_used > 0.0,
                    UsagePeriod::Monthly => usage.monthly_used > 0.0,
                }
            })
            .map(|item| item.id().to_string())
            .collect()
    });

    for id in &used {
        let mut patch = Row::new();
        patch.insert(counter_column(period).to_string(), Value::from(0.0));
        collection.update(id, patch).await?;
    }
    Ok(used.len())
}

pub struct UsageResetScheduler {
    workspace: Arc<Workspace>,
}

impl UsageResetScheduler {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    async fn reset_period(
        &self,
        owner: &str,
        period: UsagePeriod,
        today: NaiveDate,
    ) -> Result<usize, SyncError> {
        let label = period_label(period, today);
        let key = period_key(period, owner);
        match self.workspace.kv().get(&key) {
            Some(last) if last == label => return Ok(0),
            Some(_) => {}
            None => {
                debug!("First {} usage check for {}; starting from {}", period, owner, label);
                if let Err(e) = self.workspace.kv().set(&key, &label) {
                    warn!("Failed to store {} reset marker: {}", period, e);
                }
                return Ok(0);
            }
        }

        let mut count = reset_collection(&self.workspace.prepaid_cards, period).await?;
        count += reset_collection(&self.workspace.e_wallets, period).await?;

        // Only remember the period once every counter is back at zero
        if let Err(e) = self.workspace.kv().set(&key, &label) {
            warn!("Failed to store {} reset marker: {}", period, e);
        }
        if count > 0 {
            info!("Reset {} usage on {} cards and wallets for {}", period, count, label);
            self.workspace.notices().publish(Notice::new(
                NoticeLevel::Info,
                "Usage limits reset",
                format!("{} usage was reset on {} cards and wallets", period, count),
            ));
        }
        Ok(count)
    }

    /// Reset counters whose period ended before `today`
    pub async fn run_once_at(&self, today: NaiveDate) -> Result<ResetReport, SyncError> {
        let Some(owner) = self.workspace.owner() else {
            debug!("No session; skipping usage reset");
            return Ok(ResetReport::default());
        };
        Ok(ResetReport {
            daily: self.reset_period(&owner, UsagePeriod::Daily, today).await?,
            monthly: self.reset_period(&owner, UsagePeriod::Monthly, today).await?,
        })
    }

    /// Check on every tick of `interval` until `shutdown` turns true or its
    /// sender is dropped
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once_at(Local::now().date_naive()).await {
                        warn!("Usage reset failed, will retry: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Usage reset scheduler stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BackendError;
    use crate::test_utils::{TestWorkspace, TEST_OWNER};
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_key(owner: &str) -> String {
        keys::usage_reset("daily", owner)
    }

    fn monthly_key(owner: &str) -> String {
        keys::usage_reset("monthly", owner)
    }

    async fn fixture() -> (Arc<Workspace>, Arc<crate::storage::MemoryBackend>, String, String) {
        let test = TestWorkspace::new();
        let card_id = test
            .seed(
                "prepaid_cards",
                json!({
                    "name": "Travel",
                    "balance": 100.0,
                    "daily_used": 40.0,
                    "monthly_used": 400.0
                }),
            )
            .await;
        let wallet_id = test
            .seed(
                "e_wallets",
                json!({
                    "name": "Wallet",
                    "provider": "Vodafone",
                    "balance": 10.0,
                    "daily_used": 5.0,
                    "monthly_used": 0.0
                }),
            )
            .await;
        test.open().await;
        let backend = test.backend.clone();
        (Arc::new(test.workspace), backend, card_id, wallet_id)
    }

    /// Pretend the last reset happened on `last`
    fn mark(workspace: &Workspace, last: NaiveDate) {
        workspace
            .kv()
            .set(&daily_key(TEST_OWNER), &period_label(UsagePeriod::Daily, last))
            .unwrap();
        workspace
            .kv()
            .set(&monthly_key(TEST_OWNER), &period_label(UsagePeriod::Monthly, last))
            .unwrap();
    }

    #[tokio::test]
    async fn test_resets_once_per_period() {
        let (workspace, _, card_id, wallet_id) = fixture().await;
        let scheduler = UsageResetScheduler::new(workspace.clone());
        mark(&workspace, day(2025, 3, 1));

        // Same day: nothing to do
        let report = scheduler.run_once_at(day(2025, 3, 1)).await.unwrap();
        assert_eq!(report, ResetReport::default());

        // Next day: daily counters only
        let report = scheduler.run_once_at(day(2025, 3, 2)).await.unwrap();
        assert_eq!(report, ResetReport { daily: 2, monthly: 0 });
        let card = workspace.prepaid_cards.get(&card_id).unwrap();
        assert_eq!(card.daily_used, 0.0);
        assert_eq!(card.monthly_used, 400.0);
        assert_eq!(workspace.e_wallets.get(&wallet_id).unwrap().daily_used, 0.0);
        assert_eq!(workspace.kv().get(&daily_key(TEST_OWNER)).as_deref(), Some("2025-03-02"));

        assert_eq!(scheduler.run_once_at(day(2025, 3, 2)).await.unwrap(), ResetReport::default());

        // New month
        let report = scheduler.run_once_at(day(2025, 4, 1)).await.unwrap();
        assert_eq!(report.monthly, 1);
        assert_eq!(workspace.prepaid_cards.get(&card_id).unwrap().monthly_used, 0.0);
    }

    #[tokio::test]
    async fn test_first_run_keeps_todays_usage() {
        let (workspace, _, card_id, _) = fixture().await;
        let scheduler = UsageResetScheduler::new(workspace.clone());

        let report = scheduler.run_once_at(day(2025, 3, 2)).await.unwrap();
        assert_eq!(report, ResetReport::default());
        let card = workspace.prepaid_cards.get(&card_id).unwrap();
        assert_eq!(card.daily_used, 40.0);
        assert_eq!(card.monthly_used, 400.0);
        assert_eq!(workspace.kv().get(&daily_key(TEST_OWNER)).as_deref(), Some("2025-03-02"));
        assert_eq!(workspace.kv().get(&monthly_key(TEST_OWNER)).as_deref(), Some("2025-03"));

        let report = scheduler.run_once_at(day(2025, 3, 3)).await.unwrap();
        assert_eq!(report.daily, 2);
    }

    #[tokio::test]
    async fn test_markers_are_kept_per_user() {
        let (workspace, _, card_id, _) = fixture().await;
        let scheduler = UsageResetScheduler::new(workspace.clone());
        // Another user already reset today; this user last reset yesterday
        workspace.kv().set(&daily_key("user-2"), "2025-03-02").unwrap();
        mark(&workspace, day(2025, 3, 1));

        let report = scheduler.run_once_at(day(2025, 3, 2)).await.unwrap();
        assert_eq!(report.daily, 2);
        assert_eq!(workspace.prepaid_cards.get(&card_id).unwrap().daily_used, 0.0);
    }

    #[tokio::test]
    async fn test_failed_reset_is_retried() {
        let (workspace, backend, card_id, _) = fixture().await;
        let scheduler = UsageResetScheduler::new(workspace.clone());
        mark(&workspace, day(2025, 3, 1));

        backend.reject_next(BackendError::Network("timeout".to_string()));
        assert!(scheduler.run_once_at(day(2025, 3, 2)).await.is_err());
        assert_eq!(workspace.kv().get(&daily_key(TEST_OWNER)).as_deref(), Some("2025-03-01"));
        assert_eq!(workspace.prepaid_cards.get(&card_id).unwrap().daily_used, 40.0);

        let report = scheduler.run_once_at(day(2025, 3, 2)).await.unwrap();
        assert_eq!(report.daily, 2);
    }

    #[tokio::test]
    async fn test_skipped_without_session() {
        let test = TestWorkspace::new();
        let workspace = Arc::new(test.workspace);
        let scheduler = UsageResetScheduler::new(workspace.clone());
        assert_eq!(scheduler.run_once_at(day(2025, 3, 2)).await.unwrap(), ResetReport::default());
        assert_eq!(workspace.kv().get(&daily_key(TEST_OWNER)), None);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (workspace, _, card_id, _) = fixture().await;
        mark(&workspace, Local::now().date_naive() - chrono::Duration::days(1));
        let scheduler = Arc::new(UsageResetScheduler::new(workspace.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run(Duration::from_millis(10), shutdown_rx).await })
        };
        for _ in 0..100 {
            if workspace.prepaid_cards.get(&card_id).unwrap().daily_used == 0.0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(workspace.prepaid_cards.get(&card_id).unwrap().daily_used, 0.0);

        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();
    }
}
