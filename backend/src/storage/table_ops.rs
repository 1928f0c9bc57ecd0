//! Row bookkeeping shared by the backends: identifier and timestamp
//! assignment, owner-scoped lookups, and partial-update merging.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use shared::row::{row_id, row_owner, CREATED_AT_COLUMN, ID_COLUMN, OWNER_COLUMN, UPDATED_AT_COLUMN};
use shared::schema::IMMUTABLE_COLUMNS;
use shared::Row;
use uuid::Uuid;

use super::traits::BackendError;

pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Prepare a row for storage: assign id and timestamps, pin the owner
pub fn stamp_insert(mut row: Row, owner: &str) -> Result<Row, BackendError> {
    if let Some(existing) = row_owner(&row) {
        if existing != owner {
            return Err(BackendError::Unauthorized(format!(
                "cannot insert a row owned by {} as {}",
                existing, owner
            )));
        }
    }
    let now = timestamp_now();
    row.insert(ID_COLUMN.to_string(), Value::String(Uuid::new_v4().to_string()));
    row.insert(OWNER_COLUMN.to_string(), Value::String(owner.to_string()));
    row.insert(CREATED_AT_COLUMN.to_string(), Value::String(now.clone()));
    row.insert(UPDATED_AT_COLUMN.to_string(), Value::String(now));
    Ok(row)
}

/// Index of `id` within `rows`, restricted to rows owned by `owner`
pub fn find_owned(rows: &[Row], owner: &str, id: &str) -> Option<usize> {
    rows.iter()
        .position(|row| row_id(row) == Some(id) && row_owner(row) == Some(owner))
}

/// Merge `patch` into the stored row, refreshing `updated_at`
pub fn merge_update(
    rows: &mut [Row],
    table: &str,
    owner: &str,
    id: &str,
    patch: Row,
) -> Result<Row, BackendError> {
    if let Some(column) = patch.keys().find(|k| IMMUTABLE_COLUMNS.contains(&k.as_str())) {
        return Err(BackendError::Constraint(format!(
            "column {} of {} is immutable",
            column, table
        )));
    }
    let index = find_owned(rows, owner, id).ok_or_else(|| BackendError::NotFound {
        table: table.to_string(),
        id: id.to_string(),
    })?;

    let row = &mut rows[index];
    row.extend(patch);
    row.insert(UPDATED_AT_COLUMN.to_string(), Value::String(timestamp_now()));
    Ok(row.clone())
}

/// Remove the owned row with `id`
pub fn remove_owned(
    rows: &mut Vec<Row>,
    table: &str,
    owner: &str,
    id: &str,
) -> Result<Row, BackendError> {
    let index = find_owned(rows, owner, id).ok_or_else(|| BackendError::NotFound {
        table: table.to_string(),
        id: id.to_string(),
    })?;
    Ok(rows.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_stamp_insert_assigns_server_columns() {
        let stamped = stamp_insert(row(json!({"name": "Cash"})), "user-1").unwrap();
        assert!(row_id(&stamped).is_some());
        assert_eq!(row_owner(&stamped), Some("user-1"));
        assert!(stamped.contains_key("created_at"));
        assert_eq!(stamped.get("created_at"), stamped.get("updated_at"));
    }

    #[test]
    fn test_stamp_insert_rejects_foreign_owner() {
        let result = stamp_insert(row(json!({"user_id": "user-2"})), "user-1");
        assert!(matches!(result, Err(BackendError::Unauthorized(_))));
    }

    #[test]
    fn test_updates_are_owner_scoped() {
        let mut rows = vec![row(json!({"id": "a", "user_id": "user-1", "balance": 1.0}))];

        let foreign = merge_update(&mut rows, "t", "user-2", "a", row(json!({"balance": 2.0})));
        assert!(matches!(foreign, Err(BackendError::NotFound { .. })));

        let updated =
            merge_update(&mut rows, "t", "user-1", "a", row(json!({"balance": 2.0}))).unwrap();
        assert_eq!(updated.get("balance"), Some(&json!(2.0)));
        assert!(updated.contains_key("updated_at"));

        let immutable = merge_update(&mut rows, "t", "user-1", "a", row(json!({"id": "b"})));
        assert!(matches!(immutable, Err(BackendError::Constraint(_))));
    }

    #[test]
    fn test_remove_owned() {
        let mut rows = vec![row(json!({"id": "a", "user_id": "user-1"}))];
        assert!(remove_owned(&mut rows, "t", "user-2", "a").is_err());
        assert!(remove_owned(&mut rows, "t", "user-1", "a").is_ok());
        assert!(rows.is_empty());
    }
}
