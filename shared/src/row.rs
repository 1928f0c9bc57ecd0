//! # Remote Rows
//!
//! The backend hands out rows as flat JSON objects keyed by snake_case column
//! names. This module holds the `Row` alias, accessors for the columns every
//! table carries, and the serde helpers used to coerce loosely typed columns
//! into the in-app types.

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::{Map, Value};

/// A single backend row: column name -> JSON value
pub type Row = Map<String, Value>;

/// Column holding the backend-assigned identifier
pub const ID_COLUMN: &str = "id";
/// Column holding the ownership scope (the authenticated user)
pub const OWNER_COLUMN: &str = "user_id";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Read the identifier of a row, if present
pub fn row_id(row: &Row) -> Option<&str> {
    row.get(ID_COLUMN).and_then(Value::as_str)
}

/// Read the owner of a row, if present
pub fn row_owner(row: &Row) -> Option<&str> {
    row.get(OWNER_COLUMN).and_then(Value::as_str)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Number(f64),
    Text(String),
}

impl RawDecimal {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        let value = match self {
            RawDecimal::Number(n) => n,
            RawDecimal::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid decimal value: {:?}", text)))?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(E::custom("decimal value must be finite"))
        }
    }
}

/// Decimal columns arrive either as JSON numbers or as numeric strings
/// (`"100.50"`). Both are accepted; numbers are always written back.
pub mod decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        RawDecimal::deserialize(deserializer)?.into_f64()
    }
}

/// Nullable decimal columns
pub mod optional_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        match Option::<RawDecimal>::deserialize(deserializer)? {
            Some(raw) => raw.into_f64().map(Some),
            None => Ok(None),
        }
    }
}

/// Integer counters that older rows stored as strings
pub mod count {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = RawDecimal::deserialize(deserializer)?.into_f64::<D::Error>()?;
        if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(<D::Error as serde::de::Error>::custom(format!(
                "invalid count: {}",
                value
            )));
        }
        Ok(value as u32)
    }
}
