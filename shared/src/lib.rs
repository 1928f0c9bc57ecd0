//! # Shared Types
//!
//! Pure, I/O-free building blocks shared by the finance tracker's state layer:
//!
//! - **models**: one typed record per backend table
//! - **schema**: the declared row <-> entity mapping and partial-update checks
//! - **row**: the remote row type and value coercions
//! - **events**: push-channel change notifications
//! - **operations**: balance floors, payment and usage rules
//! - **fees**: fee, cashback and statement arithmetic
//! - **stats**: derived statistics over collection snapshots

pub mod events;
pub mod fees;
pub mod models;
pub mod operations;
pub mod row;
pub mod schema;
pub mod stats;

pub use events::ChangeEvent;
pub use models::*;
pub use operations::{BalanceFloor, BalanceOp, UsageLimits, UsagePeriod, ValidationError};
pub use row::Row;
pub use schema::{Entity, EntityStatus, SchemaError, UpdateDiscipline};
