//! Paying for an order.

use fulfil::status::{OrderStatus, PaymentStatus};
use serde::Serialize;
use tracing::{Span, info, warn};

use crate::{
    domain::{
        invoices::{data::NewInvoice, records::InvoiceRecord},
        orders::records::{OrderRecord, OrderUuid},
        payments::{
            data::{NewPayment, PaymentUpdate},
            records::{PaymentRecord, PaymentUuid},
        },
        users::Actor,
    },
    lifecycle::{OrderError, OrderLifecycle},
    payments::{ChargeOutcome, PaymentDetails},
};

/// A successfully paid order with its payment and invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaidOrder {
    pub order: OrderRecord,
    pub payment: PaymentRecord,
    pub invoice: InvoiceRecord,
}

impl OrderLifecycle {
    /// Charges the order total and moves the order to `PAID`.
    ///
    /// Each attempt is recorded as a payment keyed `"{order}:{attempt}"`,
    /// where `attempt` counts previously failed payments. A call that
    /// fails before the gateway answers leaves the payment `PENDING`; the
    /// next call reuses it with the same key, so the gateway never charges
    /// twice for one attempt.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] / [`OrderError::Forbidden`]
    /// - [`OrderError::InvalidState`]: order is neither `CREATED` nor
    ///   `VALIDATED`.
    /// - [`OrderError::ValidationFailed`]: no payment is recorded.
    /// - [`OrderError::PaymentDeclined`]: the payment is recorded as
    ///   `FAILED` and the order is unchanged.
    /// - [`OrderError::Gateway`] / [`OrderError::Storage`]
    #[tracing::instrument(
        name = "lifecycle.pay",
        skip(self, details),
        fields(order_uuid = %order, user_uuid = %actor.user, idempotency_key),
        err
    )]
    pub async fn pay(
        &self,
        actor: Actor,
        order: OrderUuid,
        details: &PaymentDetails,
    ) -> Result<PaidOrder, OrderError> {
        let _guard = self.order_locks.lock(order).await;

        let order = self.load_order_for(actor, order).await?;

        if !order.status.is_payable() {
            return Err(OrderError::InvalidState {
                action: "paiement",
                status: order.status,
            });
        }

        let validated = details.validate(self.clock.today())?;

        let payments = self
            .stores
            .payments
            .list_payments_for_order(order.uuid)
            .await?;

        if let Some(charged) = payments
            .iter()
            .find(|payment| payment.status == PaymentStatus::Succeeded)
        {
            warn!(payment_uuid = %charged.uuid, "order already charged, completing payment");

            return self.complete_payment(order, charged.clone()).await;
        }

        let attempt = payments
            .iter()
            .filter(|payment| payment.status == PaymentStatus::Failed)
            .count()
            + 1;

        let idempotency_key = format!("{}:{attempt}", order.uuid);

        Span::current().record("idempotency_key", idempotency_key.as_str());

        let pending = payments.into_iter().find(|payment| {
            payment.status == PaymentStatus::Pending && payment.idempotency_key == idempotency_key
        });

        let pending = match pending {
            Some(pending) => pending,
            None => {
                self.stores
                    .payments
                    .create_payment(NewPayment {
                        uuid: PaymentUuid::new(),
                        order_uuid: order.uuid,
                        amount: order.total(),
                        idempotency_key: idempotency_key.clone(),
                        card_last4: validated.card_last4.clone(),
                        contact: validated.contact.clone(),
                        created_at: self.clock.now(),
                    })
                    .await?
            }
        };

        let outcome = self
            .gateway
            .charge(&validated.card_number, pending.amount, &idempotency_key)
            .await?;

        match outcome {
            ChargeOutcome::Approved { transaction_id } => {
                let payment = self
                    .stores
                    .payments
                    .update_payment(
                        pending.uuid,
                        PaymentStatus::Pending,
                        PaymentUpdate {
                            status: PaymentStatus::Succeeded,
                            transaction_id: Some(transaction_id),
                            failure_reason: None,
                            updated_at: self.clock.now(),
                        },
                    )
                    .await?;

                self.complete_payment(order, payment).await
            }
            ChargeOutcome::Declined { reason } => {
                self.stores
                    .payments
                    .update_payment(
                        pending.uuid,
                        PaymentStatus::Pending,
                        PaymentUpdate {
                            status: PaymentStatus::Failed,
                            transaction_id: None,
                            failure_reason: Some(reason.clone()),
                            updated_at: self.clock.now(),
                        },
                    )
                    .await?;

                warn!(%reason, attempt, "payment declined");

                Err(OrderError::PaymentDeclined { reason })
            }
        }
    }

    /// Marks the order paid and issues its invoice.
    async fn complete_payment(
        &self,
        order: OrderRecord,
        payment: PaymentRecord,
    ) -> Result<PaidOrder, OrderError> {
        let order = self.advance(order, OrderStatus::Paid, "paiement").await?;

        let invoice = self
            .stores
            .invoices
            .issue_invoice(NewInvoice::for_order(&order, self.clock.now()))
            .await?;

        info!(
            payment_uuid = %payment.uuid,
            amount = %payment.amount,
            invoice_uuid = %invoice.uuid,
            "order paid"
        );

        Ok(PaidOrder {
            order,
            payment,
            invoice,
        })
    }
}
