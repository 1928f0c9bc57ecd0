//! Credit and prepaid card commands.
//!
//! Credit card purchases may run the balance down to the negative of the
//! credit limit and earn cashback at the card's rate; payments may not exceed
//! the outstanding debt unless the card allows overpayment. Prepaid cards
//! never go below zero and count every purchase against their daily and
//! monthly caps.

use chrono::Utc;
use log::{info, warn};
use shared::fees::cashback_for;
use shared::{CashbackRecord, CreditCard, PrepaidCard};
use std::sync::Arc;

use super::account_service::{credit, debit};
use super::error::CommandError;
use crate::notices::{Notice, NoticeLevel};
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOutcome {
    pub card: CreditCard,
    /// Cashback recorded for the purchase, if the card earns any
    pub cashback: Option<CashbackRecord>,
}

#[derive(Clone)]
pub struct CreditCardService {
    workspace: Arc<Workspace>,
}

impl CreditCardService {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    pub async fn purchase(
        &self,
        card_id: &str,
        amount: f64,
        description: Option<String>,
    ) -> Result<PurchaseOutcome, CommandError> {
        let card = debit(&self.workspace.credit_cards, card_id, amount).await?;
        info!("Charged {:.2} to card {} (balance {:.2})", amount, card.name, card.balance);

        let earned = cashback_for(amount, card.cashback_rate);
        if earned <= 0.0 {
            return Ok(PurchaseOutcome { card, cashback: None });
        }

        let draft = CashbackRecord {
            card_id: card.id.clone(),
            amount: earned,
            earned_on: Utc::now().date_naive(),
            description,
            ..Default::default()
        };
        // The purchase stands even if its cashback cannot be recorded
        let cashback = match self.workspace.cashback.create(draft).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to record cashback for card {}: {}", card.id, e);
                self.workspace.notices().publish(
                    Notice::new(NoticeLevel::Warning, "Cashback not recorded", e.to_string())
                        .with_entity(format!("card-{}", card.id)),
                );
                None
            }
        };
        Ok(PurchaseOutcome { card, cashback })
    }

    /// Pay down the card's debt
    pub async fn pay(&self, card_id: &str, amount: f64) -> Result<CreditCard, CommandError> {
        let card = credit(&self.workspace.credit_cards, card_id, amount).await?;
        info!("Paid {:.2} on card {} (balance {:.2})", amount, card.name, card.balance);
        Ok(card)
    }
}

#[derive(Clone)]
pub struct PrepaidCardService {
    workspace: Arc<Workspace>,
}

impl PrepaidCardService {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    pub async fn purchase(&self, card_id: &str, amount: f64) -> Result<PrepaidCard, CommandError> {
        let card = debit(&self.workspace.prepaid_cards, card_id, amount).await?;
        info!("Spent {:.2} on prepaid card {} (balance {:.2})", amount, card.name, card.balance);
        Ok(card)
    }

    pub async fn recharge(&self, card_id: &str, amount: f64) -> Result<PrepaidCard, CommandError> {
        let card = credit(&self.workspace.prepaid_cards, card_id, amount).await?;
        info!("Recharged prepaid card {} with {:.2}", card.name, amount);
        Ok(card)
    }
}
