//! Fixtures shared by the backend's unit tests.

use serde_json::Value;
use shared::Row;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::notices::NoticeBus;
use crate::storage::{MemoryBackend, MemoryKeyValueStore, RemoteTable};
use crate::workspace::Workspace;

pub const TEST_OWNER: &str = "user-1";

/// A workspace over the in-memory backend, with handles to its parts
pub struct TestWorkspace {
    pub workspace: Workspace,
    pub backend: Arc<MemoryBackend>,
    pub kv: Arc<MemoryKeyValueStore>,
    pub notices: NoticeBus,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let kv = Arc::new(MemoryKeyValueStore::new());
        let notices = NoticeBus::new();
        let workspace = Workspace::new(backend.clone(), kv.clone(), notices.clone(), config);
        Self {
            workspace,
            backend,
            kv,
            notices,
        }
    }

    /// Insert a row for the test owner directly in the backend; returns its id
    pub async fn seed(&self, table: &str, value: Value) -> String {
        let row: Row = value.as_object().cloned().unwrap_or_default();
        let stored = self.backend.insert(table, TEST_OWNER, row).await.unwrap();
        shared::row::row_id(&stored).unwrap().to_string()
    }

    /// Seed and open in one go
    pub async fn open(&self) {
        let report = self.workspace.open(TEST_OWNER).await;
        assert!(report.is_complete(), "workspace failed to open: {:?}", report.failed);
    }
}
