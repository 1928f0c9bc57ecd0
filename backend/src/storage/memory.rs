//! In-memory backend: tables held in process, a live change feed, and fault
//! injection so the sync layer's failure paths can be driven on demand.

use async_trait::async_trait;
use log::{debug, warn};
use shared::row::row_id;
use shared::{ChangeEvent, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::feed::ChangeFeed;
use super::table_ops::{merge_update, remove_owned, stamp_insert};
use super::traits::{BackendError, ChangeStream, RemoteTable};

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    feed: ChangeFeed,
    offline: AtomicBool,
    reject_next: Mutex<Option<BackendError>>,
    reject_table: Mutex<HashMap<String, BackendError>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with a network error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next write (insert, update or delete) with `error`
    pub fn reject_next(&self, error: BackendError) {
        *self.reject_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Fail the next write to `table` only
    pub fn reject_next_on(&self, table: &str, error: BackendError) {
        self.reject_table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string(), error);
    }

    /// Push an arbitrary event to subscribers, as another client's change would
    pub fn emit(&self, table: &str, owner: &str, event: ChangeEvent) {
        self.feed.publish(table, owner, event);
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        self.feed.subscriber_count(table)
    }

    /// Stored rows of `table`, regardless of owner
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::Network("backend unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_write(&self, table: &str) -> Result<(), BackendError> {
        self.check_online()?;
        let rejection = self
            .reject_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .or_else(|| {
                self.reject_table
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(table)
            });
        match rejection {
            Some(error) => {
                warn!("Rejecting write as requested: {}", error);
                Err(error)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteTable for MemoryBackend {
    async fn select_owned(&self, table: &str, owner: &str) -> Result<Vec<Row>, BackendError> {
        self.check_online()?;
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| shared::row::row_owner(row) == Some(owner))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!("Selected {} rows from {} for {}", rows.len(), table, owner);
        Ok(rows)
    }

    async fn insert(&self, table: &str, owner: &str, row: Row) -> Result<Row, BackendError> {
        self.check_write(table)?;
        let stored = stamp_insert(row, owner)?;
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());

        self.feed.publish(table, owner, ChangeEvent::Insert { row: stored.clone() });
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        owner: &str,
        id: &str,
        patch: Row,
    ) -> Result<Row, BackendError> {
        self.check_write(table)?;
        let stored = {
            let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
            let rows = tables.entry(table.to_string()).or_default();
            merge_update(rows, table, owner, id, patch)?
        };

        self.feed.publish(table, owner, ChangeEvent::Update { row: stored.clone() });
        Ok(stored)
    }

    async fn delete(&self, table: &str, owner: &str, id: &str) -> Result<(), BackendError> {
        self.check_write(table)?;
        let removed = {
            let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
            let rows = tables.entry(table.to_string()).or_default();
            remove_owned(rows, table, owner, id)?
        };

        let id = row_id(&removed).unwrap_or(id).to_string();
        self.feed.publish(table, owner, ChangeEvent::Delete { id });
        Ok(())
    }

    async fn subscribe(&self, table: &str, owner: &str) -> Result<ChangeStream, BackendError> {
        self.check_online()?;
        Ok(self.feed.subscribe(table, owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_crud_round_trip_publishes_events() {
        let backend = MemoryBackend::new();
        let mut stream = backend.subscribe("cash_vaults", "user-1").await.unwrap();

        let stored = backend
            .insert("cash_vaults", "user-1", row(json!({"name": "Safe"})))
            .await
            .unwrap();
        let id = row_id(&stored).unwrap().to_string();
        assert!(matches!(stream.next().await, Some(ChangeEvent::Insert { .. })));

        let updated = backend
            .update("cash_vaults", "user-1", &id, row(json!({"name": "Main safe"})))
            .await
            .unwrap();
        assert_eq!(updated.get("name"), Some(&json!("Main safe")));
        assert!(matches!(stream.next().await, Some(ChangeEvent::Update { .. })));

        backend.delete("cash_vaults", "user-1", &id).await.unwrap();
        assert_eq!(stream.next().await, Some(ChangeEvent::Delete { id }));
        assert!(backend.rows("cash_vaults").is_empty());
    }

    #[tokio::test]
    async fn test_select_is_owner_scoped() {
        let backend = MemoryBackend::new();
        backend.insert("cash_vaults", "user-1", row(json!({"name": "Mine"}))).await.unwrap();
        backend.insert("cash_vaults", "user-2", row(json!({"name": "Theirs"}))).await.unwrap();

        let rows = backend.select_owned("cash_vaults", "user-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("Mine")));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(
            backend.select_owned("cash_vaults", "user-1").await,
            Err(BackendError::Network(_))
        ));
        backend.set_offline(false);

        backend.reject_next(BackendError::Constraint("duplicate".to_string()));
        assert!(backend.insert("cash_vaults", "user-1", Row::new()).await.is_err());
        assert!(backend.insert("cash_vaults", "user-1", Row::new()).await.is_ok());
    }
}
