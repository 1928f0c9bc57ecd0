//! # CSV Table Repository
//!
//! File-backed implementation of `RemoteTable`. Every table lives in its own
//! CSV file inside the data directory; the columns shared by all tables get
//! their own CSV columns and the entity-specific columns are stored together
//! as a JSON object.
//!
//! ## File Structure
//!
//! ```text
//! data/
//! ├── bank_accounts.csv
//! ├── credit_cards.csv
//! └── ...
//! ```
//!
//! ## CSV Format
//!
//! ```csv
//! id,user_id,created_at,updated_at,data
//! 6f1c,user-1,2025-01-20T10:00:00Z,2025-01-21T09:00:00Z,"{""name"":""Main"",""balance"":15.0}"
//! ```
//!
//! Writes go to a temp file that is renamed over the original. Change events
//! are published to subscribers in this process only.

use async_trait::async_trait;
use csv::{Reader, Writer};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::row::{CREATED_AT_COLUMN, ID_COLUMN, OWNER_COLUMN, UPDATED_AT_COLUMN};
use shared::{ChangeEvent, Row};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::sync::{Mutex, PoisonError};

use super::connection::CsvConnection;
use crate::storage::feed::ChangeFeed;
use crate::storage::table_ops::{merge_update, remove_owned, stamp_insert};
use crate::storage::traits::{BackendError, ChangeStream, RemoteTable};

/// CSV record structure for one stored row
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableRecord {
    id: String,
    user_id: String,
    created_at: String,
    updated_at: String,
    data: String,
}

fn text_column(row: &mut Row, column: &str) -> String {
    match row.remove(column) {
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

impl TryFrom<Row> for TableRecord {
    type Error = BackendError;

    fn try_from(mut row: Row) -> Result<Self, BackendError> {
        let id = text_column(&mut row, ID_COLUMN);
        let user_id = text_column(&mut row, OWNER_COLUMN);
        let created_at = text_column(&mut row, CREATED_AT_COLUMN);
        let updated_at = text_column(&mut row, UPDATED_AT_COLUMN);
        let data = serde_json::to_string(&row).map_err(|e| BackendError::Storage(e.to_string()))?;
        Ok(TableRecord {
            id,
            user_id,
            created_at,
            updated_at,
            data,
        })
    }
}

impl TryFrom<TableRecord> for Row {
    type Error = BackendError;

    fn try_from(record: TableRecord) -> Result<Self, BackendError> {
        let mut row: Row =
            serde_json::from_str(&record.data).map_err(|e| BackendError::Storage(e.to_string()))?;
        row.insert(ID_COLUMN.to_string(), Value::String(record.id));
        row.insert(OWNER_COLUMN.to_string(), Value::String(record.user_id));
        row.insert(CREATED_AT_COLUMN.to_string(), Value::String(record.created_at));
        row.insert(UPDATED_AT_COLUMN.to_string(), Value::String(record.updated_at));
        Ok(row)
    }
}

fn storage_error(error: impl std::fmt::Display) -> BackendError {
    BackendError::Storage(error.to_string())
}

/// CSV-backed table store
pub struct CsvBackend {
    connection: CsvConnection,
    feed: ChangeFeed,
    /// Serializes read-modify-write cycles on the files
    write_lock: Mutex<()>,
}

impl CsvBackend {
    pub fn new(connection: CsvConnection) -> Self {
        Self {
            connection,
            feed: ChangeFeed::new(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_rows(&self, table: &str) -> Result<Vec<Row>, BackendError> {
        let path = self.connection.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path).map_err(storage_error)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        let mut rows = Vec::new();

        for result in reader.deserialize::<TableRecord>() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable record in {:?}: {}", path, e);
                    continue;
                }
            };
            match Row::try_from(record) {
                Ok(row) => rows.push(row),
                Err(e) => warn!("Skipping corrupt row in {:?}: {}", path, e),
            }
        }

        Ok(rows)
    }

    fn write_rows(&self, table: &str, rows: &[Row]) -> Result<(), BackendError> {
        let path = self.connection.table_path(table);
        let temp_path = path.with_extension("csv.tmp");

        {
            let file = File::create(&temp_path).map_err(storage_error)?;
            let mut writer = Writer::from_writer(BufWriter::new(file));
            for row in rows {
                let record = TableRecord::try_from(row.clone())?;
                writer.serialize(record).map_err(storage_error)?;
            }
            writer.flush().map_err(storage_error)?;
        }

        std::fs::rename(&temp_path, &path).map_err(storage_error)?;
        debug!("Wrote {} rows to {:?}", rows.len(), path);
        Ok(())
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        self.feed.subscriber_count(table)
    }
}

#[async_trait]
impl RemoteTable for CsvBackend {
    async fn select_owned(&self, table: &str, owner: &str) -> Result<Vec<Row>, BackendError> {
        let rows = self.read_rows(table)?;
        Ok(rows
            .into_iter()
            .filter(|row| shared::row::row_owner(row) == Some(owner))
            .collect())
    }

    async fn insert(&self, table: &str, owner: &str, row: Row) -> Result<Row, BackendError> {
        let stored = stamp_insert(row, owner)?;
        {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut rows = self.read_rows(table)?;
            rows.push(stored.clone());
            self.write_rows(table, &rows)?;
        }

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
        let stored = {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut rows = self.read_rows(table)?;
            let stored = merge_update(&mut rows, table, owner, id, patch)?;
            self.write_rows(table, &rows)?;
            stored
        };

        self.feed.publish(table, owner, ChangeEvent::Update { row: stored.clone() });
        Ok(stored)
    }

    async fn delete(&self, table: &str, owner: &str, id: &str) -> Result<(), BackendError> {
        {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut rows = self.read_rows(table)?;
            remove_owned(&mut rows, table, owner, id)?;
            self.write_rows(table, &rows)?;
        }

        self.feed.publish(table, owner, ChangeEvent::Delete { id: id.to_string() });
        Ok(())
    }

    async fn subscribe(&self, table: &str, owner: &str) -> Result<ChangeStream, BackendError> {
        Ok(self.feed.subscribe(table, owner))
    }
}
