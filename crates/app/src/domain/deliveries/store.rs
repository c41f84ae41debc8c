//! Deliveries store.

use async_trait::async_trait;
use fulfil::status::DeliveryStatus;
use jiff::Timestamp;
use mockall::automock;
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        deliveries::{
            data::NewDelivery,
            records::{DeliveryRecord, DeliveryUuid},
            repository::PgDeliveriesRepository,
        },
        errors::StoreError,
        orders::records::OrderUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgDeliveriesStore {
    db: Db,
    repository: PgDeliveriesRepository,
}

impl PgDeliveriesStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgDeliveriesRepository::new(),
        }
    }
}

#[async_trait]
impl DeliveriesStore for PgDeliveriesStore {
    async fn get_delivery_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Option<DeliveryRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let delivery = self.repository.get_delivery_for_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(delivery)
    }

    #[tracing::instrument(
        name = "deliveries.store.create_delivery",
        skip(self, delivery),
        fields(
            delivery_uuid = %delivery.uuid,
            order_uuid = %delivery.order_uuid,
            carrier = %delivery.carrier
        ),
        err
    )]
    async fn create_delivery(&self, delivery: NewDelivery) -> Result<DeliveryRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_delivery(&mut tx, delivery).await?;

        tx.commit().await?;

        info!(tracking_number = %created.tracking_number, "prepared delivery");

        Ok(created)
    }

    #[tracing::instrument(
        name = "deliveries.store.update_delivery_status",
        skip(self, at),
        fields(delivery_uuid = %delivery, from = %expected, to = %status),
        err
    )]
    async fn update_delivery_status(
        &self,
        delivery: DeliveryUuid,
        expected: DeliveryStatus,
        status: DeliveryStatus,
        at: Timestamp,
    ) -> Result<DeliveryRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let updated = self
            .repository
            .update_delivery_status(&mut tx, delivery, expected, status, at)
            .await?;

        let Some(updated) = updated else {
            if self.repository.get_delivery(&mut tx, delivery).await?.is_none() {
                return Err(StoreError::NotFound);
            }

            warn!("delivery status changed concurrently");

            return Err(StoreError::Conflict);
        };

        tx.commit().await?;

        Ok(updated)
    }
}

/// Deliveries, one per order at most.
#[automock]
#[async_trait]
pub trait DeliveriesStore: Send + Sync {
    async fn get_delivery_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Option<DeliveryRecord>, StoreError>;

    /// Creates a `PREPAREE` delivery. [`StoreError::AlreadyExists`] when the
    /// order already has one.
    async fn create_delivery(&self, delivery: NewDelivery) -> Result<DeliveryRecord, StoreError>;

    /// Compare-and-set status change.
    async fn update_delivery_status(
        &self,
        delivery: DeliveryUuid,
        expected: DeliveryStatus,
        status: DeliveryStatus,
        at: Timestamp,
    ) -> Result<DeliveryRecord, StoreError>;
}
