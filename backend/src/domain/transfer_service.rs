//! # Transfer Service
//!
//! Moves money between any two balance holders addressed by destination
//! key, charging an optional fee to the source.
//!
//! ## Steps
//!
//! 1. Parse and resolve both keys; check the destination would accept the amount
//! 2. Debit `amount + fee` from the source
//! 3. Credit `amount` to the destination; if that fails, refund the source
//! 4. Record a `central_transfers` row
//!
//! The two balance writes are separate backend calls. Compensation in step 3
//! keeps a failed transfer from losing money; a failed compensation is
//! reported as an error notice for manual reconciliation.

use log::{error, info, warn};
use shared::fees::FeeRule;
use shared::operations::{round_cents, validate_amount};
use shared::{CentralTransfer, ValidationError};
use std::sync::Arc;

use super::account_service::{check_credit_key, credit_key, debit_key, parse_key, refund_key};
use super::destination::resolve_key;
use super::error::CommandError;
use crate::notices::{Notice, NoticeLevel};
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub source_key: String,
    pub destination_key: String,
    pub amount: f64,
    pub fee_rule: FeeRule,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct TransferService {
    workspace: Arc<Workspace>,
}

impl TransferService {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Returns the transfer record. If the record itself cannot be saved the
    /// balances have still moved; the unsaved record is returned with an
    /// empty id and a warning notice goes out.
    pub async fn transfer(
        &self,
        request: TransferRequest,
    ) -> Result<CentralTransfer, CommandError> {
        let source = parse_key(&request.source_key)?;
        let destination = parse_key(&request.destination_key)?;
        if source == destination {
            return Err(ValidationError::SameEndpoints.into());
        }
        let amount = validate_amount(request.amount)?;
        for key in [&source, &destination] {
            if resolve_key(&self.workspace, key).is_none() {
                return Err(CommandError::UnknownDestination(key.to_string()));
            }
        }

        let fee = request.fee_rule.fee_for(amount);
        let total = round_cents(amount + fee);
        check_credit_key(&self.workspace, &destination, amount)?;

        debit_key(&self.workspace, &source, total).await?;

        if let Err(e) = credit_key(&self.workspace, &destination, amount).await {
            warn!(
                "Transfer to {} failed, returning {:.2} to {}: {}",
                destination, total, source, e
            );
            if let Err(compensation) = refund_key(&self.workspace, &source, total).await {
                error!("Could not return {:.2} to {}: {}", total, source, compensation);
                self.workspace.notices().publish(
                    Notice::new(
                        NoticeLevel::Error,
                        "Transfer needs attention",
                        format!(
                            "{:.2} left {} but did not arrive at {}",
                            total, source, destination
                        ),
                    )
                    .with_entity(source.to_string()),
                );
            }
            return Err(e.into());
        }

        info!("Transferred {:.2} (fee {:.2}) from {} to {}", amount, fee, source, destination);

        let draft = CentralTransfer {
            source_key: source.to_string(),
            destination_key: destination.to_string(),
            amount,
            fee,
            description: request.description,
            ..Default::default()
        };
        match self.workspace.transfers.create(draft.clone()).await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!("Transfer from {} to {} not recorded: {}", source, destination, e);
                self.workspace.notices().publish(Notice::new(
                    NoticeLevel::Warning,
                    "Transfer not recorded",
                    e.to_string(),
                ));
                Ok(draft)
            }
        }
    }
}
