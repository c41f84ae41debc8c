//! In-memory deliveries store.

use async_trait::async_trait;
use fulfil::status::DeliveryStatus;
use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::domain::{
    deliveries::{
        data::NewDelivery,
        records::{DeliveryRecord, DeliveryUuid},
        store::DeliveriesStore,
    },
    errors::StoreError,
    orders::records::OrderUuid,
};

/// Deliveries keyed by their order.
#[derive(Debug, Default)]
pub struct MemoryDeliveriesStore {
    deliveries: Mutex<FxHashMap<OrderUuid, DeliveryRecord>>,
}

impl MemoryDeliveriesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveriesStore for MemoryDeliveriesStore {
    async fn get_delivery_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Option<DeliveryRecord>, StoreError> {
        Ok(self.deliveries.lock().await.get(&order).cloned())
    }

    async fn create_delivery(&self, delivery: NewDelivery) -> Result<DeliveryRecord, StoreError> {
        let mut deliveries = self.deliveries.lock().await;

        if deliveries.contains_key(&delivery.order_uuid) {
            return Err(StoreError::AlreadyExists);
        }

        let record = DeliveryRecord {
            uuid: delivery.uuid,
            order_uuid: delivery.order_uuid,
            carrier: delivery.carrier,
            tracking_number: delivery.tracking_number,
            status: DeliveryStatus::Prepared,
            created_at: delivery.created_at,
            updated_at: delivery.created_at,
        };

        deliveries.insert(record.order_uuid, record.clone());

        Ok(record)
    }

    async fn update_delivery_status(
        &self,
        delivery: DeliveryUuid,
        expected: DeliveryStatus,
        status: DeliveryStatus,
        at: Timestamp,
    ) -> Result<DeliveryRecord, StoreError> {
        let mut deliveries = self.deliveries.lock().await;

        let stored = deliveries
            .values_mut()
            .find(|stored| stored.uuid == delivery)
            .ok_or(StoreError::NotFound)?;

        if stored.status != expected {
            return Err(StoreError::Conflict);
        }

        stored.status = status;
        stored.updated_at = at;

        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn new_delivery(order: OrderUuid) -> NewDelivery {
        NewDelivery {
            uuid: DeliveryUuid::new(),
            order_uuid: order,
            carrier: "POSTE".to_string(),
            tracking_number: "TRK-1".to_string(),
            created_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn an_order_has_at_most_one_delivery() -> TestResult {
        let store = MemoryDeliveriesStore::new();
        let order = OrderUuid::new();

        let created = store.create_delivery(new_delivery(order)).await?;

        assert_eq!(created.status, DeliveryStatus::Prepared);

        let second = store.create_delivery(new_delivery(order)).await;

        assert!(
            matches!(second, Err(StoreError::AlreadyExists)),
            "expected AlreadyExists, got {second:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn status_updates_are_compare_and_set() -> TestResult {
        let store = MemoryDeliveriesStore::new();
        let created = store.create_delivery(new_delivery(OrderUuid::new())).await?;

        let moved = store
            .update_delivery_status(
                created.uuid,
                DeliveryStatus::Prepared,
                DeliveryStatus::InTransit,
                Timestamp::UNIX_EPOCH,
            )
            .await?;

        assert_eq!(moved.status, DeliveryStatus::InTransit);

        let stale = store
            .update_delivery_status(
                created.uuid,
                DeliveryStatus::Prepared,
                DeliveryStatus::InTransit,
                Timestamp::UNIX_EPOCH,
            )
            .await;

        assert!(
            matches!(stale, Err(StoreError::Conflict)),
            "expected Conflict, got {stale:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_order_has_no_delivery() -> TestResult {
        let store = MemoryDeliveriesStore::new();

        assert!(store.get_delivery_for_order(OrderUuid::new()).await?.is_none());

        Ok(())
    }
}
