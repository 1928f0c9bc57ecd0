//! # Synchronized Collection
//!
//! An in-memory, ordered mirror of one backend table, scoped to the signed-in
//! user and kept current by the backend's change stream.
//!
//! ## Lifecycle
//!
//! ```text
//! open(owner) ──> scope ──> subscribe ──> bulk load ──> replay buffered events
//!                                              │
//! events ─────────────────────────────────────┴──> apply_event (upsert/delete by id)
//! close() / drop ──> abort listener ──> clear
//! ```
//!
//! Mutations validate locally, call the backend and merge the acknowledged
//! row. Results that arrive after the collection was re-scoped are dropped.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use shared::schema::{apply_patch, to_insert_row, to_local, validate_patch};
use shared::{ChangeEvent, Entity, Row, UpdateDiscipline};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use super::error::SyncError;
use super::merge::CollectionState;
use crate::notices::{Notice, NoticeBus, NoticeLevel};
use crate::storage::{BackendError, RemoteTable};

/// Operations the workspace drives on every collection regardless of entity type
#[async_trait]
pub trait ManagedCollection: Send + Sync {
    fn table(&self) -> &'static str;

    /// Scope to `owner`, start listening and load the owner's rows
    async fn open(&self, owner: &str) -> Result<usize, SyncError>;

    async fn close(&self);
}

pub struct SyncedCollection<E: Entity> {
    remote: Arc<dyn RemoteTable>,
    notices: NoticeBus,
    state: Arc<RwLock<CollectionState<E>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    /// Held from reading the current item until its update is acknowledged
    writes: AsyncMutex<()>,
}

impl<E: Entity> SyncedCollection<E> {
    pub fn new(remote: Arc<dyn RemoteTable>, notices: NoticeBus) -> Self {
        Self {
            remote,
            notices,
            state: Arc::new(RwLock::new(CollectionState::default())),
            listener: Mutex::new(None),
            writes: AsyncMutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CollectionState<E>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CollectionState<E>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Owner and epoch of the current scope
    fn scope(&self) -> Result<(String, u64), SyncError> {
        let state = self.read();
        match &state.owner {
            Some(owner) => Ok((owner.clone(), state.epoch)),
            None => Err(SyncError::NoSession),
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.read().epoch == epoch
    }

    fn stale(&self) -> SyncError {
        debug!("Dropping {} result for a previous scope", E::TABLE);
        SyncError::StaleScope { table: E::TABLE }
    }

    fn report(&self, title: &str, entity_id: Option<&str>, err: &SyncError) {
        let mut notice = Notice::new(NoticeLevel::Error, title, err.to_string());
        if let Some(id) = entity_id {
            notice = notice.with_entity(format!("{}-{}", E::DOMAIN, id));
        }
        self.notices.publish(notice);
    }

    /// Point the collection at `owner`. A different owner discards the
    /// current items and stops the listener of the old scope.
    fn begin_scope(&self, owner: &str) -> u64 {
        let mut state = self.write();
        if state.owner.as_deref() != Some(owner) {
            state.rescope(Some(owner.to_string()));
            drop(state);
            self.stop_listener();
            state = self.write();
        } else {
            state.epoch += 1;
        }
        state.loading = true;
        state.pending.clear();
        state.epoch
    }

    /// Load every row owned by `owner`, replacing the collection's contents.
    /// On failure the collection is left empty and an error notice goes out.
    pub async fn initialize(&self, owner: &str) -> Result<usize, SyncError> {
        let epoch = self.begin_scope(owner);
        self.load(owner, epoch).await
    }

    async fn load(&self, owner: &str, epoch: u64) -> Result<usize, SyncError> {
        let result = self.remote.select_owned(E::TABLE, owner).await;

        let mut state = self.write();
        if state.epoch != epoch {
            return Err(self.stale());
        }
        match result {
            Ok(rows) => {
                let count = state.finish_load(rows);
                info!("Loaded {} {} rows for {}", count, E::TABLE, owner);
                Ok(count)
            }
            Err(e) => {
                state.items.clear();
                state.pending.clear();
                state.loading = false;
                drop(state);
                error!("Failed to load {}: {}", E::TABLE, e);
                let err = SyncError::from(e);
                self.report(&format!("Could not load {}", E::TABLE), None, &err);
                Err(err)
            }
        }
    }

    /// Open the change stream for the current owner. Re-subscribing replaces
    /// the previous listener.
    pub async fn subscribe(&self) -> Result<(), SyncError> {
        let (owner, _) = self.scope()?;
        let mut stream = self.remote.subscribe(E::TABLE, &owner).await?;

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                state.write().unwrap_or_else(PoisonError::into_inner).apply(event);
            }
            debug!("Change stream for {} closed", E::TABLE);
        });

        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
            let _ = previous.await;
        }
        debug!("Subscribed to {} changes for {}", E::TABLE, owner);
        Ok(())
    }

    fn stop_listener(&self) -> Option<JoinHandle<()>> {
        let handle = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = &handle {
            handle.abort();
        }
        handle
    }

    /// Stop listening and forget the current scope
    pub async fn teardown(&self) {
        if let Some(handle) = self.stop_listener() {
            // Resolves once the task (and with it the stream) has been dropped
            let _ = handle.await;
        }
        self.write().rescope(None);
        debug!("Tore down {}", E::TABLE);
    }

    /// Apply one pushed change to the local collection
    pub fn apply_event(&self, event: ChangeEvent) {
        self.write().apply(event);
    }

    /// Validate locally, insert and merge the acknowledged row
    pub async fn create(&self, draft: E) -> Result<E, SyncError> {
        let (owner, epoch) = self.scope()?;
        draft.validate()?;
        let row = to_insert_row(&draft, &owner)?;

        let stored = match self.remote.insert(E::TABLE, &owner, row).await {
            Ok(stored) => stored,
            Err(e) => {
                let err = SyncError::from(e);
                if self.is_current(epoch) {
                    warn!("Insert into {} rejected: {}", E::TABLE, err);
                    self.report(&format!("Could not save to {}", E::TABLE), None, &err);
                }
                return Err(err);
            }
        };

        let entity: E = to_local(&stored)?;
        let mut state = self.write();
        if state.epoch != epoch {
            return Err(self.stale());
        }
        state.upsert(entity.clone());
        Ok(entity)
    }

    /// Apply a partial update. Optimistic domains show the change
    /// immediately and revert it if the backend rejects; the rest wait for
    /// the acknowledged row.
    pub async fn update(&self, id: &str, patch: Row) -> Result<E, SyncError> {
        let _writing = self.writes.lock().await;
        let scope = self.scope()?;
        let current = self.require(id)?;
        self.update_from(scope, id, current, patch).await
    }

    /// Build a patch from the current item and apply it. Updates to the same
    /// collection run one at a time, so `build` always sees the outcome of
    /// the previous one.
    pub async fn modify<F>(&self, id: &str, build: F) -> Result<E, SyncError>
    where
        F: FnOnce(&E) -> Result<Row, SyncError> + Send,
    {
        let _writing = self.writes.lock().await;
        let scope = self.scope()?;
        let current = self.require(id)?;
        let patch = build(&current)?;
        self.update_from(scope, id, current, patch).await
    }

    fn require(&self, id: &str) -> Result<E, SyncError> {
        self.get(id).ok_or_else(|| SyncError::NotFound {
            table: E::TABLE,
            id: id.to_string(),
        })
    }

    async fn update_from(
        &self,
        (owner, epoch): (String, u64),
        id: &str,
        current: E,
        patch: Row,
    ) -> Result<E, SyncError> {
        let patch = validate_patch::<E>(&patch)?;
        let patched = apply_patch(&current, &patch)?;
        patched.validate()?;

        if E::UPDATE_DISCIPLINE == UpdateDiscipline::Optimistic {
            let mut state = self.write();
            if let Some(index) = state.position(id) {
                state.items[index] = patched.clone();
            }
        }

        let result = self.remote.update(E::TABLE, &owner, id, patch).await;

        let mut state = self.write();
        if state.epoch != epoch {
            return Err(self.stale());
        }
        match result {
            Ok(stored) => {
                let entity: E = to_local(&stored)?;
                state.upsert(entity.clone());
                Ok(entity)
            }
            Err(e) => {
                if E::UPDATE_DISCIPLINE == UpdateDiscipline::Optimistic {
                    // Only revert if nothing newer replaced the optimistic copy
                    if let Some(index) = state.position(id) {
                        if state.items[index] == patched {
                            state.items[index] = current;
                        }
                    }
                }
                drop(state);
                let err = SyncError::from(e);
                warn!("Update of {} row {} rejected: {}", E::TABLE, id, err);
                self.report(&format!("Could not update {}", E::TABLE), Some(id), &err);
                Err(err)
            }
        }
    }

    /// Remove immediately; put the row back where it was if the backend
    /// rejects. A row the backend no longer has counts as deleted.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let (owner, epoch) = self.scope()?;
        let removed = self.write().remove(id);
        if removed.is_none() {
            debug!("Deleting {} row {} not present locally", E::TABLE, id);
        }

        let result = self.remote.delete(E::TABLE, &owner, id).await;

        let mut state = self.write();
        if state.epoch != epoch {
            return Err(self.stale());
        }
        match result {
            Ok(()) => Ok(()),
            Err(BackendError::NotFound { .. }) => {
                debug!("{} row {} was already gone", E::TABLE, id);
                Ok(())
            }
            Err(e) => {
                state.tombstones.remove(id);
                if let Some((index, item)) = removed {
                    if state.position(id).is_none() {
                        let index = index.min(state.items.len());
                        state.items.insert(index, item);
                    }
                }
                drop(state);
                let err = SyncError::from(e);
                warn!("Delete of {} row {} rejected: {}", E::TABLE, id, err);
                self.report(&format!("Could not delete from {}", E::TABLE), Some(id), &err);
                Err(err)
            }
        }
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.read().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<E> {
        let state = self.read();
        state.position(id).map(|index| state.items[index].clone())
    }

    /// Run `f` over the current items without cloning them
    pub fn with_items<R>(&self, f: impl FnOnce(&[E]) -> R) -> R {
        f(&self.read().items)
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn owner(&self) -> Option<String> {
        self.read().owner.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }
}

#[async_trait]
impl<E: Entity> ManagedCollection for SyncedCollection<E> {
    fn table(&self) -> &'static str {
        E::TABLE
    }

    async fn open(&self, owner: &str) -> Result<usize, SyncError> {
        let epoch = self.begin_scope(owner);
        // Listen first so nothing written during the load is missed
        if let Err(e) = self.subscribe().await {
            warn!("Could not subscribe to {}: {}", E::TABLE, e);
        }
        self.load(owner, epoch).await
    }

    async fn close(&self) {
        self.teardown().await;
    }
}

impl<E: Entity> Drop for SyncedCollection<E> {
    fn drop(&mut self) {
        self.stop_listener();
    }
}
