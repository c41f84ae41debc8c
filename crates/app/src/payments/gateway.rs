//! Payment gateway client and the deterministic sandbox gateway.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fulfil::money::Money;
use mockall::automock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Suffix of card numbers the sandbox always declines.
pub const DECLINED_CARD_SUFFIX: &str = "0000";

/// Failure reason reported for declined sandbox charges.
pub const CARD_REFUSED: &str = "card refused";

/// Result of a charge the gateway processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

/// Result of a refund the gateway processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundOutcome {
    pub refund_id: String,
}

/// The gateway could not be reached or answered nonsense.
///
/// Declines are not errors; they are a [`ChargeOutcome`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway unavailable")]
    Unavailable,

    #[error("unexpected payment gateway response: {0}")]
    UnexpectedResponse(String),
}

/// Card payment processor.
///
/// Both calls are idempotent per `idempotency_key`: repeating a key returns
/// the first outcome without executing again.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` to the sanitized `card_number`.
    async fn charge(
        &self,
        card_number: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<ChargeOutcome, GatewayError>;

    /// Refund `amount` of the charge identified by `transaction_id`.
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<RefundOutcome, GatewayError>;

    /// Outcome of the charge made under `idempotency_key`, or `None` if the
    /// gateway never processed one.
    async fn find_charge(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<ChargeOutcome>, GatewayError>;
}

/// In-process gateway with a fixed decline rule: any card ending in
/// [`DECLINED_CARD_SUFFIX`] is refused, everything else is approved.
#[derive(Debug, Default)]
pub struct SandboxGateway {
    charges: Mutex<FxHashMap<String, ChargeOutcome>>,
    refunds: Mutex<FxHashMap<String, RefundOutcome>>,
    executed_charges: AtomicUsize,
}

impl SandboxGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Charges actually executed, replays excluded.
    #[must_use]
    pub fn executed_charges(&self) -> usize {
        self.executed_charges.load(Ordering::Relaxed)
    }
}

fn reference(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::now_v7().simple())
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    #[tracing::instrument(
        name = "gateway.sandbox.charge",
        skip(self, card_number),
        fields(amount = %amount),
        err
    )]
    async fn charge(
        &self,
        card_number: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<ChargeOutcome, GatewayError> {
        let mut charges = self.charges.lock().await;

        if let Some(outcome) = charges.get(idempotency_key) {
            debug!("replaying charge outcome");

            return Ok(outcome.clone());
        }

        let outcome = if card_number.ends_with(DECLINED_CARD_SUFFIX) {
            ChargeOutcome::Declined {
                reason: CARD_REFUSED.to_string(),
            }
        } else {
            ChargeOutcome::Approved {
                transaction_id: reference("txn"),
            }
        };

        self.executed_charges.fetch_add(1, Ordering::Relaxed);

        charges.insert(idempotency_key.to_string(), outcome.clone());

        info!(?outcome, "charge executed");

        Ok(outcome)
    }

    #[tracing::instrument(
        name = "gateway.sandbox.refund",
        skip(self),
        fields(amount = %amount),
        err
    )]
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<RefundOutcome, GatewayError> {
        let mut refunds = self.refunds.lock().await;

        let outcome = refunds
            .entry(idempotency_key.to_string())
            .or_insert_with(|| RefundOutcome {
                refund_id: reference("rfd"),
            })
            .clone();

        Ok(outcome)
    }

    async fn find_charge(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<ChargeOutcome>, GatewayError> {
        Ok(self.charges.lock().await.get(idempotency_key).cloned())
    }
}
