//! In-memory payments store.

use async_trait::async_trait;
use fulfil::status::PaymentStatus;
use tokio::sync::Mutex;

use crate::domain::{
    errors::StoreError,
    orders::records::OrderUuid,
    payments::{
        data::{NewPayment, PaymentUpdate},
        records::{PaymentRecord, PaymentUuid},
        store::PaymentsStore,
    },
};

/// Payments kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryPaymentsStore {
    payments: Mutex<Vec<PaymentRecord>>,
}

impl MemoryPaymentsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentsStore for MemoryPaymentsStore {
    async fn create_payment(&self, payment: NewPayment) -> Result<PaymentRecord, StoreError> {
        let mut payments = self.payments.lock().await;

        let duplicate = payments.iter().any(|existing| {
            existing.uuid == payment.uuid
                || (existing.order_uuid == payment.order_uuid
                    && existing.idempotency_key == payment.idempotency_key)
        });

        if duplicate {
            return Err(StoreError::AlreadyExists);
        }

        let record = PaymentRecord {
            uuid: payment.uuid,
            order_uuid: payment.order_uuid,
            amount: payment.amount,
            status: PaymentStatus::Pending,
            idempotency_key: payment.idempotency_key,
            transaction_id: None,
            failure_reason: None,
            card_last4: payment.card_last4,
            contact: payment.contact,
            created_at: payment.created_at,
            updated_at: payment.created_at,
        };

        payments.push(record.clone());

        Ok(record)
    }

    async fn list_payments_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let payments = self.payments.lock().await;

        Ok(payments
            .iter()
            .filter(|payment| payment.order_uuid == order)
            .cloned()
            .collect())
    }

    async fn update_payment(
        &self,
        payment: PaymentUuid,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<PaymentRecord, StoreError> {
        let mut payments = self.payments.lock().await;

        let order_uuid = payments
            .iter()
            .find(|stored| stored.uuid == payment)
            .map(|stored| stored.order_uuid)
            .ok_or(StoreError::NotFound)?;

        if update.status == PaymentStatus::Succeeded
            && payments.iter().any(|stored| {
                stored.order_uuid == order_uuid
                    && stored.uuid != payment
                    && stored.status == PaymentStatus::Succeeded
            })
        {
            return Err(StoreError::AlreadyExists);
        }

        let stored = payments
            .iter_mut()
            .find(|stored| stored.uuid == payment)
            .ok_or(StoreError::NotFound)?;

        if stored.status != expected {
            return Err(StoreError::Conflict);
        }

        stored.status = update.status;
        stored.updated_at = update.updated_at;

        if update.transaction_id.is_some() {
            stored.transaction_id = update.transaction_id;
        }

        if update.failure_reason.is_some() {
            stored.failure_reason = update.failure_reason;
        }

        Ok(stored.clone())
    }
}
