//! Pure state transitions for a collection. Everything here runs under the
//! collection's write lock and never awaits.

use log::{debug, warn};
use shared::schema::to_local;
use shared::{ChangeEvent, Entity, Row};
use std::collections::HashSet;

/// Mutable state of one collection
pub(crate) struct CollectionState<E> {
    pub items: Vec<E>,
    pub owner: Option<String>,
    /// Bumped on every re-scope; in-flight results compare against it
    pub epoch: u64,
    /// True while a bulk load is in flight
    pub loading: bool,
    /// Events received during the bulk load, replayed on top of its result
    pub pending: Vec<ChangeEvent>,
    /// Ids deleted in this scope; late inserts for them are ignored
    pub tombstones: HashSet<String>,
}

impl<E> Default for CollectionState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            owner: None,
            epoch: 0,
            loading: false,
            pending: Vec::new(),
            tombstones: HashSet::new(),
        }
    }
}

impl<E: Entity> CollectionState<E> {
    /// Start a new scope. Everything from the previous scope is discarded.
    pub fn rescope(&mut self, owner: Option<String>) -> u64 {
        self.epoch += 1;
        self.owner = owner;
        self.items.clear();
        self.pending.clear();
        self.tombstones.clear();
        self.loading = false;
        self.epoch
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Insert or replace by id. An incoming copy older than the local one is
    /// ignored so out-of-order events cannot roll the collection back.
    pub fn upsert(&mut self, entity: E) -> bool {
        if self.tombstones.contains(entity.id()) {
            debug!("Ignoring {} row {}: deleted in this scope", E::TABLE, entity.id());
            return false;
        }
        match self.position(entity.id()) {
            Some(index) => {
                if self.items[index].updated_at() > entity.updated_at() {
                    debug!("Ignoring stale copy of {} row {}", E::TABLE, entity.id());
                    return false;
                }
                self.items[index] = entity;
            }
            None => self.items.push(entity),
        }
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<(usize, E)> {
        self.tombstones.insert(id.to_string());
        self.position(id).map(|index| (index, self.items.remove(index)))
    }

    /// Parse an incoming row, skipping rows of another owner
    fn accept_row(&self, row: &Row) -> Option<E> {
        let entity = match to_local::<E>(row) {
            Ok(entity) => entity,
            Err(e) => {
                warn!("Ignoring malformed {} row: {}", E::TABLE, e);
                return None;
            }
        };
        if self.owner.as_deref() != Some(entity.owner()) {
            warn!("Ignoring {} row {} outside the current scope", E::TABLE, entity.id());
            return None;
        }
        Some(entity)
    }

    /// Apply a pushed change. Applying the same event twice leaves the same state.
    pub fn apply(&mut self, event: ChangeEvent) {
        if self.owner.is_none() {
            return;
        }
        if self.loading {
            self.pending.push(event);
            return;
        }
        match event {
            ChangeEvent::Insert { row } | ChangeEvent::Update { row } => {
                if let Some(entity) = self.accept_row(&row) {
                    self.upsert(entity);
                }
            }
            ChangeEvent::Delete { id } => {
                self.remove(&id);
            }
        }
    }

    /// Install a completed bulk load and replay what arrived meanwhile
    pub fn finish_load(&mut self, rows: Vec<Row>) -> usize {
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(entity) = self.accept_row(row) {
                if !self.tombstones.contains(entity.id()) {
                    items.push(entity);
                }
            }
        }
        self.items = items;
        self.loading = false;

        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            debug!("Replaying {} {} events received during load", pending.len(), E::TABLE);
        }
        for event in pending {
            self.apply(event);
        }
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use shared::schema::to_remote;
    use shared::BankAccount;

    fn account(id: &str, balance: f64, minute: u32) -> BankAccount {
        BankAccount {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            name: format!("Account {}", id),
            bank_name: "CIB".to_string(),
            balance,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap(),
            ..Default::default()
        }
    }

    fn scoped() -> CollectionState<BankAccount> {
        let mut state = CollectionState::default();
        state.rescope(Some("user-1".to_string()));
        state
    }

    fn insert(entity: &BankAccount) -> ChangeEvent {
        ChangeEvent::Insert { row: to_remote(entity).unwrap() }
    }

    #[test]
    fn test_applying_an_event_twice_is_idempotent() {
        let mut state = scoped();
        let event = insert(&account("a", 100.0, 0));

        state.apply(event.clone());
        let once = state.items.clone();
        state.apply(event);
        assert_eq!(state.items, once);
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn test_applying_an_update_twice_is_idempotent() {
        let mut state = scoped();
        state.apply(insert(&account("a", 100.0, 0)));
        state.apply(insert(&account("b", 50.0, 0)));
        let update = ChangeEvent::Update { row: to_remote(&account("a", 250.0, 3)).unwrap() };

        state.apply(update.clone());
        let once = state.items.clone();
        state.apply(update);
        assert_eq!(state.items, once);
        assert_eq!(state.items[0].balance, 250.0);
        assert_eq!(state.items.len(), 2);
    }

    #[test]
    fn test_applying_a_delete_twice_is_idempotent() {
        let mut state = scoped();
        state.apply(insert(&account("a", 100.0, 0)));
        state.apply(insert(&account("b", 50.0, 0)));
        let delete = ChangeEvent::Delete { id: "a".to_string() };

        state.apply(delete.clone());
        let once = state.items.clone();
        state.apply(delete);
        assert_eq!(state.items, once);
        let ids: Vec<&str> = state.items.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_older_update_does_not_overwrite_newer() {
        let mut state = scoped();
        state.apply(insert(&account("a", 300.0, 5)));
        state.apply(ChangeEvent::Update { row: to_remote(&account("a", 100.0, 1)).unwrap() });
        assert_eq!(state.items[0].balance, 300.0);
    }

    #[test]
    fn test_late_insert_after_delete_is_ignored() {
        let mut state = scoped();
        state.apply(ChangeEvent::Delete { id: "a".to_string() });
        state.apply(insert(&account("a", 100.0, 0)));
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_rows_of_other_owners_are_ignored() {
        let mut state = scoped();
        let mut foreign = account("a", 100.0, 0);
        foreign.user_id = "user-2".to_string();
        state.apply(insert(&foreign));
        assert!(state.items.is_empty());

        let malformed = json!({"id": "b", "colour": "red"}).as_object().cloned().unwrap();
        state.apply(ChangeEvent::Insert { row: malformed });
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_events_during_load_are_replayed() {
        let mut state = scoped();
        state.loading = true;
        state.apply(insert(&account("late", 50.0, 0)));
        state.apply(ChangeEvent::Delete { id: "gone".to_string() });
        assert!(state.items.is_empty());

        let rows = vec![
            to_remote(&account("a", 100.0, 0)).unwrap(),
            to_remote(&account("gone", 10.0, 0)).unwrap(),
        ];
        assert_eq!(state.finish_load(rows), 2);
        let ids: Vec<&str> = state.items.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "late"]);
    }

    #[test]
    fn test_rescope_discards_previous_state() {
        let mut state = scoped();
        state.apply(insert(&account("a", 100.0, 0)));
        let epoch = state.epoch;

        state.rescope(Some("user-2".to_string()));
        assert!(state.items.is_empty());
        assert!(state.epoch > epoch);
    }
}
