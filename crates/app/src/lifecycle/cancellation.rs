//! Cancellation and refunds.

use fulfil::{
    money::Money,
    status::{OrderStatus, PaymentStatus},
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    domain::{
        orders::records::{OrderRecord, OrderUuid},
        payments::{data::PaymentUpdate, records::PaymentRecord},
        users::Actor,
    },
    lifecycle::{OrderError, OrderLifecycle, require_admin},
    payments::{ChargeOutcome, GatewayError},
};

/// Failure reason of a pending payment the gateway never charged.
const NEVER_CHARGED: &str = "order cancelled before charge";

/// Outcome of a cancel or refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cancellation {
    pub order: OrderRecord,

    /// Amount returned to the customer by this call.
    pub refunded: Money,
}

impl OrderLifecycle {
    /// Cancels an order on behalf of its owner or an admin.
    ///
    /// An unpaid order becomes `CANCELLED`. A paid order is refunded in
    /// full and becomes `REFUNDED`, with both `cancelled_at` and
    /// `refunded_at` set. Either way its stock is released. Cancelling an
    /// order that is already cancelled or refunded changes nothing.
    ///
    /// Payments an unpaid order left `PENDING` are settled with the
    /// gateway first; one that was charged after all is refunded.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] / [`OrderError::Forbidden`]
    /// - [`OrderError::InvalidState`]: order is shipped or delivered.
    /// - [`OrderError::Gateway`] / [`OrderError::Storage`]: the order is
    ///   left open and still holds its stock.
    #[tracing::instrument(
        name = "lifecycle.cancel",
        skip(self),
        fields(order_uuid = %order, user_uuid = %actor.user, is_admin = actor.is_admin),
        err
    )]
    pub async fn cancel(&self, actor: Actor, order: OrderUuid) -> Result<Cancellation, OrderError> {
        let _guard = self.order_locks.lock(order).await;

        let order = self.load_order_for(actor, order).await?;

        match order.status {
            OrderStatus::Cancelled | OrderStatus::Refunded => {
                debug!(status = %order.status, "order already closed");

                Ok(Cancellation {
                    order,
                    refunded: Money::ZERO,
                })
            }
            OrderStatus::Paid => self.refund_paid(order, true).await,
            OrderStatus::Created | OrderStatus::Validated => {
                self.settle_pending(&order).await?;

                let refunded = self.refund_succeeded(&order).await?;

                let order = self
                    .close(order, OrderStatus::Cancelled, "annulation")
                    .await?;

                info!(%refunded, "order cancelled");

                Ok(Cancellation { order, refunded })
            }
            OrderStatus::Shipped | OrderStatus::Delivered => Err(OrderError::InvalidState {
                action: "annulation",
                status: order.status,
            }),
        }
    }

    /// Refunds a `PAID` order in full and releases its stock.
    ///
    /// Refunding an order that is already cancelled or refunded changes
    /// nothing.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`]: caller is not an admin.
    /// - [`OrderError::NotFound`] / [`OrderError::InvalidState`]
    /// - [`OrderError::Gateway`] / [`OrderError::Storage`]
    #[tracing::instrument(
        name = "lifecycle.admin_refund",
        skip(self),
        fields(order_uuid = %order, admin_uuid = %actor.user),
        err
    )]
    pub async fn admin_refund(
        &self,
        actor: Actor,
        order: OrderUuid,
    ) -> Result<Cancellation, OrderError> {
        require_admin(actor)?;

        let _guard = self.order_locks.lock(order).await;

        let order = self.load_order(order).await?;

        match order.status {
            OrderStatus::Cancelled | OrderStatus::Refunded => Ok(Cancellation {
                order,
                refunded: Money::ZERO,
            }),
            OrderStatus::Paid => self.refund_paid(order, false).await,
            status => Err(OrderError::InvalidState {
                action: "remboursement",
                status,
            }),
        }
    }

    /// Refunds every `SUCCEEDED` payment, releases the stock and moves the
    /// order to `REFUNDED`.
    async fn refund_paid(
        &self,
        mut order: OrderRecord,
        cancelled: bool,
    ) -> Result<Cancellation, OrderError> {
        let refunded = self.refund_succeeded(&order).await?;

        if cancelled {
            order.timeline.stamp(OrderStatus::Cancelled, self.clock.now());
        }

        let order = self
            .close(order, OrderStatus::Refunded, "remboursement")
            .await?;

        info!(%refunded, "order refunded");

        Ok(Cancellation { order, refunded })
    }

    /// Resolves each `PENDING` payment with the outcome the gateway
    /// recorded for its key. One the gateway never saw is marked `FAILED`.
    async fn settle_pending(&self, order: &OrderRecord) -> Result<(), OrderError> {
        let payments = self
            .stores
            .payments
            .list_payments_for_order(order.uuid)
            .await?;

        for payment in payments
            .into_iter()
            .filter(|payment| payment.status == PaymentStatus::Pending)
        {
            let outcome = self.gateway.find_charge(&payment.idempotency_key).await?;

            let (status, transaction_id, failure_reason) = match outcome {
                Some(ChargeOutcome::Approved { transaction_id }) => {
                    warn!(payment_uuid = %payment.uuid, "pending payment was charged");

                    (PaymentStatus::Succeeded, Some(transaction_id), None)
                }
                Some(ChargeOutcome::Declined { reason }) => {
                    (PaymentStatus::Failed, None, Some(reason))
                }
                None => (PaymentStatus::Failed, None, Some(NEVER_CHARGED.to_string())),
            };

            self.stores
                .payments
                .update_payment(
                    payment.uuid,
                    PaymentStatus::Pending,
                    PaymentUpdate {
                        status,
                        transaction_id,
                        failure_reason,
                        updated_at: self.clock.now(),
                    },
                )
                .await?;
        }

        Ok(())
    }

    /// Refunds every `SUCCEEDED` payment of the order through the gateway.
    /// Returns the amount refunded.
    async fn refund_succeeded(&self, order: &OrderRecord) -> Result<Money, OrderError> {
        let payments = self
            .stores
            .payments
            .list_payments_for_order(order.uuid)
            .await?;

        let mut refunded = Money::ZERO;

        for payment in payments
            .into_iter()
            .filter(|payment| payment.status == PaymentStatus::Succeeded)
        {
            refunded = refunded + self.refund_payment(payment).await?;
        }

        Ok(refunded)
    }

    async fn refund_payment(&self, payment: PaymentRecord) -> Result<Money, OrderError> {
        let Some(transaction_id) = payment.transaction_id.as_deref() else {
            error!(payment_uuid = %payment.uuid, "succeeded payment has no transaction id");

            return Err(GatewayError::UnexpectedResponse(format!(
                "payment {} succeeded without a transaction id",
                payment.uuid
            ))
            .into());
        };

        self.gateway
            .refund(
                transaction_id,
                payment.amount,
                &format!("{}:refund", payment.uuid),
            )
            .await?;

        self.stores
            .payments
            .update_payment(
                payment.uuid,
                PaymentStatus::Succeeded,
                PaymentUpdate {
                    status: PaymentStatus::Refunded,
                    transaction_id: None,
                    failure_reason: None,
                    updated_at: self.clock.now(),
                },
            )
            .await?;

        Ok(payment.amount)
    }
}
