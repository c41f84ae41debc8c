//! In-memory orders store.

use async_trait::async_trait;
use fulfil::{status::OrderStatus, timeline::OrderTimeline};
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::domain::{
    errors::StoreError,
    orders::{
        data::NewOrder,
        records::{OrderRecord, OrderUuid},
        store::OrdersStore,
    },
    users::UserUuid,
};

#[derive(Debug, Default)]
pub struct MemoryOrdersStore {
    orders: Mutex<FxHashMap<OrderUuid, OrderRecord>>,
}

impl MemoryOrdersStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut orders: Vec<OrderRecord>) -> Vec<OrderRecord> {
    orders.sort_by(|a, b| (b.timeline.created_at, b.uuid).cmp(&(a.timeline.created_at, a.uuid)));

    orders
}

#[async_trait]
impl OrdersStore for MemoryOrdersStore {
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, StoreError> {
        let mut orders = self.orders.lock().await;

        if orders.contains_key(&order.uuid) {
            return Err(StoreError::AlreadyExists);
        }

        let record = OrderRecord {
            uuid: order.uuid,
            user_uuid: order.user_uuid,
            status: OrderStatus::Created,
            lines: order.lines,
            timeline: OrderTimeline::new(order.created_at),
        };

        orders.insert(record.uuid, record.clone());

        Ok(record)
    }

    async fn get_order(&self, order: OrderUuid) -> Result<OrderRecord, StoreError> {
        self.orders
            .lock()
            .await
            .get(&order)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_orders_for_user(&self, user: UserUuid) -> Result<Vec<OrderRecord>, StoreError> {
        let orders = self.orders.lock().await;

        Ok(newest_first(
            orders
                .values()
                .filter(|order| order.user_uuid == user)
                .cloned()
                .collect(),
        ))
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let orders = self.orders.lock().await;

        Ok(newest_first(orders.values().cloned().collect()))
    }

    async fn update_order(
        &self,
        order: OrderRecord,
        expected: OrderStatus,
    ) -> Result<OrderRecord, StoreError> {
        let mut orders = self.orders.lock().await;

        let stored = orders.get_mut(&order.uuid).ok_or(StoreError::NotFound)?;

        if stored.status != expected {
            return Err(StoreError::Conflict);
        }

        stored.status = order.status;

        for status in OrderStatus::ALL {
            if let Some(at) = order.timeline.at(*status) {
                stored.timeline.stamp(*status, at);
            }
        }

        Ok(stored.clone())
    }
}
