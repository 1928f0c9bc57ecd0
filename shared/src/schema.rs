//! # Entity Schema and Transforms
//!
//! Bidirectional mapping between the backend row shape and the typed in-app
//! entities. Every entity declares the fixed set of columns it owns; anything
//! outside that set is rejected instead of being carried along silently.
//!
//! ## Naming
//!
//! Rows use snake_case column names. Older clients wrote camelCase keys on the
//! same objects (`creditLimit` next to `credit_limit`), so camelCase spellings
//! of declared columns are accepted on input and normalized. Output is always
//! the canonical snake_case row.
//!
//! ## Round trip
//!
//! For any canonical row `row` (decimals as JSON floats, timestamps as RFC 3339
//! UTC with a `Z` suffix), `to_remote(&to_local::<E>(&row)?)? == row`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operations::ValidationError;
use crate::row::{Row, CREATED_AT_COLUMN, ID_COLUMN, OWNER_COLUMN, UPDATED_AT_COLUMN};

/// Columns a client may never write through a partial update
pub const IMMUTABLE_COLUMNS: &[&str] = &[ID_COLUMN, OWNER_COLUMN, CREATED_AT_COLUMN];

/// Columns assigned by the backend on insert
pub const SERVER_ASSIGNED_COLUMNS: &[&str] = &[ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN];

/// When a domain module reflects an update in its local collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateDiscipline {
    /// Apply locally before the round trip, revert if the backend rejects
    Optimistic,
    /// Apply only the row the backend acknowledged
    OnAck,
}

/// Lifecycle flag shared by most entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl EntityStatus {
    pub fn is_active(self) -> bool {
        self == EntityStatus::Active
    }
}

/// A record type mirrored from one backend table
pub trait Entity:
    Clone + std::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Backend table name
    const TABLE: &'static str;
    /// Short domain name used in destination keys, notices and storage keys
    const DOMAIN: &'static str;
    /// Every column this entity reads or writes
    const FIELDS: &'static [&'static str];
    const UPDATE_DISCIPLINE: UpdateDiscipline;

    fn id(&self) -> &str;

    fn owner(&self) -> &str;

    /// Backend timestamp of the last write, used to drop out-of-order events
    fn updated_at(&self) -> DateTime<Utc>;

    /// Local validation run before any create round trip
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown column '{field}' for table {table}")]
    UnknownField { table: &'static str, field: String },
    #[error("column '{field}' of table {table} cannot be updated")]
    ImmutableField { table: &'static str, field: String },
    #[error("invalid {table} row: {reason}")]
    InvalidRow { table: &'static str, reason: String },
}

/// Convert a camelCase key to snake_case (`creditLimit` -> `credit_limit`)
pub fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert a snake_case key to camelCase (`credit_limit` -> `creditLimit`)
pub fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Resolve an incoming key to the declared column it names
fn canonical_column<E: Entity>(key: &str) -> Result<&'static str, SchemaError> {
    if let Some(field) = E::FIELDS.iter().find(|f| **f == key) {
        return Ok(*field);
    }
    let snake = snake_case(key);
    E::FIELDS
        .iter()
        .find(|f| **f == snake)
        .copied()
        .ok_or_else(|| SchemaError::UnknownField {
            table: E::TABLE,
            field: key.to_string(),
        })
}

/// Normalize a row's keys to canonical columns. Canonical spellings win over
/// legacy aliases when both are present.
pub fn normalize_row<E: Entity>(row: &Row) -> Result<Row, SchemaError> {
    let mut normalized = Row::new();
    let mut aliased = Vec::new();

    for (key, value) in row {
        let column = canonical_column::<E>(key)?;
        if column == key.as_str() {
            normalized.insert(column.to_string(), value.clone());
        } else {
            aliased.push((column, value.clone()));
        }
    }

    for (column, value) in aliased {
        normalized.entry(column.to_string()).or_insert(value);
    }

    Ok(normalized)
}

/// Backend row -> typed entity
pub fn to_local<E: Entity>(row: &Row) -> Result<E, SchemaError> {
    let normalized = normalize_row::<E>(row)?;
    serde_json::from_value(Value::Object(normalized)).map_err(|e| SchemaError::InvalidRow {
        table: E::TABLE,
        reason: e.to_string(),
    })
}

/// Typed entity -> canonical backend row
pub fn to_remote<E: Entity>(entity: &E) -> Result<Row, SchemaError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(SchemaError::InvalidRow {
            table: E::TABLE,
            reason: format!("entity serialized to a non-object value: {}", other),
        }),
        Err(e) => Err(SchemaError::InvalidRow {
            table: E::TABLE,
            reason: e.to_string(),
        }),
    }
}

/// Row for an insert request: the entity's columns minus what the backend assigns
pub fn to_insert_row<E: Entity>(entity: &E, owner: &str) -> Result<Row, SchemaError> {
    let mut row = to_remote(entity)?;
    for column in SERVER_ASSIGNED_COLUMNS {
        row.remove(*column);
    }
    row.insert(OWNER_COLUMN.to_string(), Value::String(owner.to_string()));
    Ok(row)
}

/// Check a partial update against the entity's declared columns and return it
/// with canonical keys
pub fn validate_patch<E: Entity>(patch: &Row) -> Result<Row, SchemaError> {
    let normalized = normalize_row::<E>(patch)?;
    if let Some(field) = normalized.keys().find(|k| IMMUTABLE_COLUMNS.contains(&k.as_str())) {
        return Err(SchemaError::ImmutableField {
            table: E::TABLE,
            field: field.clone(),
        });
    }
    Ok(normalized)
}

/// Merge a partial update into an entity
pub fn apply_patch<E: Entity>(entity: &E, patch: &Row) -> Result<E, SchemaError> {
    let patch = validate_patch::<E>(patch)?;
    let mut row = to_remote(entity)?;
    row.extend(patch);
    to_local(&row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BankAccount, CreditCard};
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn canonical_card_row() -> Row {
        row(json!({
            "id": "card-1",
            "user_id": "user-1",
            "name": "Gold Visa",
            "bank_name": "CIB",
            "card_number_last4": "4242",
            "credit_limit": 20000.0,
            "balance": -1500.5,
            "allow_overpayment": false,
            "cashback_rate": 1.5,
            "statement_day": 25,
            "due_day": 10,
            "status": "active",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-02T08:30:00Z"
        }))
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(snake_case("creditLimit"), "credit_limit");
        assert_eq!(snake_case("balance"), "balance");
        assert_eq!(camel_case("card_number_last4"), "cardNumberLast4");
        assert_eq!(snake_case(&camel_case("min_balance_alert")), "min_balance_alert");
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let original = canonical_card_row();
        let card: CreditCard = to_local(&original).unwrap();
        let back = to_remote(&card).unwrap();
        assert_eq!(back, original);
    }

    fn assert_round_trip<E: Entity>(columns: Value) {
        let mut original = row(json!({
            "id": "row-1",
            "user_id": "user-1",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-02T08:30:00Z"
        }));
        original.extend(row(columns));

        let declared: Vec<&str> = original.keys().map(String::as_str).collect();
        assert_eq!(declared.len(), E::FIELDS.len(), "row for {} is not fully populated", E::TABLE);

        let entity: E = to_local(&original).unwrap();
        assert_eq!(to_remote(&entity).unwrap(), original, "round trip changed a {} row", E::TABLE);
    }

    #[test]
    fn test_every_entity_round_trips_a_full_row() {
        use crate::models::*;

        assert_round_trip::<BankAccount>(json!({
            "name": "Main",
            "bank_name": "CIB",
            "account_number": "001-22",
            "balance": 1250.75,
            "min_balance_alert": 300.0,
            "status": "active"
        }));
        assert_round_trip::<Budget>(json!({
            "category": "Groceries",
            "limit_amount": 4000.0,
            "spent": 1325.5,
            "period": "weekly"
        }));
        assert_round_trip::<CashVault>(json!({
            "name": "Safe",
            "location": "Office",
            "balance": 900.0,
            "capacity": 5000.0,
            "status": "inactive"
        }));
        assert_round_trip::<CashbackRecord>(json!({
            "card_id": "card-1",
            "amount": 12.5,
            "earned_on": "2025-03-14",
            "description": "Groceries"
        }));
        assert_round_trip::<CentralTransfer>(json!({
            "source_key": "bank-1",
            "destination_key": "vault-2",
            "amount": 200.0,
            "fee": 2.5,
            "description": "Top up"
        }));
        assert_round_trip::<CreditCard>(json!({
            "name": "Gold",
            "bank_name": "NBE",
            "card_number_last4": "1234",
            "credit_limit": 10000.0,
            "balance": -250.25,
            "allow_overpayment": true,
            "cashback_rate": 1.5,
            "statement_day": 25,
            "due_day": 10,
            "status": "suspended"
        }));
        assert_round_trip::<Customer>(json!({
            "name": "Mona",
            "phone": "0100",
            "email": "mona@example.com",
            "balance": 150.0,
            "notes": "Pays monthly"
        }));
        assert_round_trip::<EWallet>(json!({
            "name": "Wallet",
            "provider": "Vodafone",
            "phone_number": "0101",
            "balance": 640.0,
            "daily_limit": 5000.0,
            "monthly_limit": 50000.0,
            "daily_used": 100.0,
            "monthly_used": 2300.0,
            "status": "active"
        }));
        assert_round_trip::<Investment>(json!({
            "name": "Gold bars",
            "kind": "metal",
            "invested_amount": 20000.0,
            "current_value": 23500.5,
            "status": "active"
        }));
        assert_round_trip::<PosMachine>(json!({
            "name": "Shop POS",
            "provider": "Fawry",
            "location": "Shop",
            "balance": 780.0,
            "fee_percentage": 1.75,
            "status": "active"
        }));
        assert_round_trip::<PrepaidCard>(json!({
            "name": "Travel",
            "provider": "Meeza",
            "balance": 300.0,
            "daily_limit": 1000.0,
            "monthly_limit": 8000.0,
            "daily_used": 50.0,
            "monthly_used": 700.0,
            "status": "active"
        }));
        assert_round_trip::<Reconciliation>(json!({
            "source_key": "vault-2",
            "expected_balance": 900.0,
            "actual_balance": 880.0,
            "notes": "Short by 20",
            "reconciled_at": "2025-03-01T17:45:00Z"
        }));
        assert_round_trip::<Sale>(json!({
            "customer_id": "cust-1",
            "amount": 350.0,
            "cost": 200.0,
            "description": "Phone case",
            "sold_at": "2025-02-20T11:00:00Z"
        }));
        assert_round_trip::<SavingsCircle>(json!({
            "name": "Family circle",
            "monthly_amount": 1000.0,
            "member_count": 10,
            "current_round": 3,
            "my_turn": 7,
            "status": "active"
        }));
    }

    #[test]
    fn test_legacy_camel_case_keys_are_accepted() {
        let mut legacy = canonical_card_row();
        let limit = legacy.remove("credit_limit").unwrap();
        legacy.insert("creditLimit".to_string(), limit);

        let card: CreditCard = to_local(&legacy).unwrap();
        assert_eq!(card.credit_limit, 20000.0);
        assert_eq!(to_remote(&card).unwrap(), canonical_card_row());
    }

    #[test]
    fn test_canonical_key_wins_over_alias() {
        let mut both = canonical_card_row();
        both.insert("creditLimit".to_string(), json!(1.0));

        let card: CreditCard = to_local(&both).unwrap();
        assert_eq!(card.credit_limit, 20000.0);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut loose = canonical_card_row();
        loose.insert("balance".to_string(), json!("-1500.50"));

        let card: CreditCard = to_local(&loose).unwrap();
        assert_eq!(card.balance, -1500.5);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut extra = canonical_card_row();
        extra.insert("pin_code".to_string(), json!("1234"));

        let err = to_local::<CreditCard>(&extra).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                table: "credit_cards",
                field: "pin_code".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let mut bad = canonical_card_row();
        bad.insert("status".to_string(), json!("frozen"));
        assert!(matches!(
            to_local::<CreditCard>(&bad),
            Err(SchemaError::InvalidRow { .. })
        ));
    }

    #[test]
    fn test_validate_patch_rejects_immutable_and_unknown() {
        let immutable = row(json!({"user_id": "someone-else"}));
        assert!(matches!(
            validate_patch::<BankAccount>(&immutable),
            Err(SchemaError::ImmutableField { .. })
        ));

        let unknown = row(json!({"colour": "blue"}));
        assert!(matches!(
            validate_patch::<BankAccount>(&unknown),
            Err(SchemaError::UnknownField { .. })
        ));

        let camel = row(json!({"minBalanceAlert": 250.0}));
        let normalized = validate_patch::<BankAccount>(&camel).unwrap();
        assert_eq!(normalized.get("min_balance_alert"), Some(&json!(250.0)));
    }

    #[test]
    fn test_apply_patch_merges_fields() {
        let card: CreditCard = to_local(&canonical_card_row()).unwrap();
        let patch = row(json!({"balance": -200.0, "name": "Platinum"}));
        let patched = apply_patch(&card, &patch).unwrap();

        assert_eq!(patched.balance, -200.0);
        assert_eq!(patched.name, "Platinum");
        assert_eq!(patched.credit_limit, card.credit_limit);
        assert_eq!(patched.id, card.id);
    }

    #[test]
    fn test_insert_row_strips_server_columns() {
        let card: CreditCard = to_local(&canonical_card_row()).unwrap();
        let insert = to_insert_row(&card, "user-2").unwrap();

        assert!(!insert.contains_key("id"));
        assert!(!insert.contains_key("created_at"));
        assert!(!insert.contains_key("updated_at"));
        assert_eq!(insert.get("user_id"), Some(&json!("user-2")));
    }
}
