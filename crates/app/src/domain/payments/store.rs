//! Payments store.

use async_trait::async_trait;
use fulfil::status::PaymentStatus;
use mockall::automock;
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        errors::StoreError,
        orders::records::OrderUuid,
        payments::{
            data::{NewPayment, PaymentUpdate},
            records::{PaymentRecord, PaymentUuid},
            repository::PgPaymentsRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgPaymentsStore {
    db: Db,
    repository: PgPaymentsRepository,
}

impl PgPaymentsStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgPaymentsRepository::new(),
        }
    }
}

#[async_trait]
impl PaymentsStore for PgPaymentsStore {
    #[tracing::instrument(
        name = "payments.store.create_payment",
        skip(self, payment),
        fields(
            payment_uuid = %payment.uuid,
            order_uuid = %payment.order_uuid,
            idempotency_key = %payment.idempotency_key
        ),
        err
    )]
    async fn create_payment(&self, payment: NewPayment) -> Result<PaymentRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_payment(&mut tx, payment).await?;

        tx.commit().await?;

        info!("recorded pending payment");

        Ok(created)
    }

    async fn list_payments_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let payments = self
            .repository
            .list_payments_for_order(&mut tx, order)
            .await?;

        tx.commit().await?;

        Ok(payments)
    }

    #[tracing::instrument(
        name = "payments.store.update_payment",
        skip(self, update),
        fields(payment_uuid = %payment, from = %expected, to = %update.status),
        err
    )]
    async fn update_payment(
        &self,
        payment: PaymentUuid,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<PaymentRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let updated = self
            .repository
            .update_payment(&mut tx, payment, expected, update)
            .await?;

        let Some(updated) = updated else {
            if self.repository.get_payment(&mut tx, payment).await?.is_none() {
                return Err(StoreError::NotFound);
            }

            warn!("payment status changed concurrently");

            return Err(StoreError::Conflict);
        };

        tx.commit().await?;

        Ok(updated)
    }
}

/// Payment attempts.
///
/// At most one payment per order may be `SUCCEEDED`; a second one is
/// rejected with [`StoreError::AlreadyExists`].
#[automock]
#[async_trait]
pub trait PaymentsStore: Send + Sync {
    /// Records a `PENDING` attempt. Idempotency keys are unique per order.
    async fn create_payment(&self, payment: NewPayment) -> Result<PaymentRecord, StoreError>;

    /// Every attempt for `order`, oldest first.
    async fn list_payments_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, StoreError>;

    /// Compare-and-set status change; [`StoreError::Conflict`] unless the
    /// stored status is still `expected`.
    async fn update_payment(
        &self,
        payment: PaymentUuid,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<PaymentRecord, StoreError>;
}
