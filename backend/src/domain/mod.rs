//! # Domain Module
//!
//! Commands and background checks built on top of the synchronized
//! collections.
//!
//! ## Key Components
//!
//! - **destination**: `<domain>-<id>` keys and lookups across balance holders
//! - **account_service**: deposits and withdrawals addressed by key
//! - **card_service**: credit card purchases (with cashback) and payments,
//!   prepaid purchases and recharges
//! - **transfer_service**: transfers between any two balance holders, with fees
//! - **alerts**: low-balance notices with a per-entity cooldown
//! - **usage_reset**: daily and monthly usage counter resets
//!
//! Every command validates against the entity's rules before anything leaves
//! the client; a rejected command leaves every collection unchanged.

pub mod account_service;
pub mod alerts;
pub mod card_service;
pub mod destination;
pub mod error;
pub mod transfer_service;
pub mod usage_reset;

pub use account_service::AccountService;
pub use alerts::LowBalanceMonitor;
pub use card_service::{CreditCardService, PrepaidCardService, PurchaseOutcome};
pub use destination::{DestinationKey, DestinationKind, DestinationSummary};
pub use error::CommandError;
pub use transfer_service::{TransferRequest, TransferService};
pub use usage_reset::{ResetReport, UsageResetScheduler};
