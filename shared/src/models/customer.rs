use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require_text;
use crate::operations::ValidationError;
use crate::row::decimal;
use crate::schema::{Entity, UpdateDiscipline};

/// A customer of the business; `balance` is what they currently owe
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Customer {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, with = "decimal")]
    pub balance: f64,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Customer {
    const TABLE: &'static str = "customers";
    const DOMAIN: &'static str = "customer";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "phone",
        "email",
        "balance",
        "notes",
        "created_at",
        "updated_at",
    ];
    const UPDATE_DISCIPLINE: UpdateDiscipline = UpdateDiscipline::Optimistic;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")?;
        if let Some(email) = &self.email {
            if !email.is_empty() && !email.contains('@') {
                return Err(ValidationError::OutOfRange { field: "email" });
            }
        }
        Ok(())
    }
}
