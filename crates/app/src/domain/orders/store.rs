//! Orders store.

use async_trait::async_trait;
use fulfil::status::OrderStatus;
use mockall::automock;
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        errors::StoreError,
        orders::{
            data::NewOrder,
            records::{OrderRecord, OrderUuid},
            repository::PgOrdersRepository,
        },
        users::UserUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgOrdersStore {
    db: Db,
    repository: PgOrdersRepository,
}

impl PgOrdersStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgOrdersRepository::new(),
        }
    }
}

#[async_trait]
impl OrdersStore for PgOrdersStore {
    #[tracing::instrument(
        name = "orders.store.create_order",
        skip(self, order),
        fields(
            order_uuid = %order.uuid,
            user_uuid = %order.user_uuid,
            line_count = order.lines.len()
        ),
        err
    )]
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_order(&mut tx, order).await?;

        tx.commit().await?;

        info!("created order");

        Ok(created)
    }

    async fn get_order(&self, order: OrderUuid) -> Result<OrderRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let order = self.repository.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn list_orders_for_user(&self, user: UserUuid) -> Result<Vec<OrderRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let orders = self.repository.list_orders(&mut tx, Some(user)).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let orders = self.repository.list_orders(&mut tx, None).await?;

        tx.commit().await?;

        Ok(orders)
    }

    #[tracing::instrument(
        name = "orders.store.update_order",
        skip(self, order),
        fields(order_uuid = %order.uuid, from = %expected, to = %order.status),
        err
    )]
    async fn update_order(
        &self,
        order: OrderRecord,
        expected: OrderStatus,
    ) -> Result<OrderRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let updated = self
            .repository
            .update_order(&mut tx, &order, expected)
            .await?;

        let Some(updated) = updated else {
            let exists = self.repository.order_exists(&mut tx, order.uuid).await?;

            if !exists {
                return Err(StoreError::NotFound);
            }

            warn!("order status changed concurrently");

            return Err(StoreError::Conflict);
        };

        tx.commit().await?;

        Ok(updated)
    }
}

/// Orders and their lines.
#[automock]
#[async_trait]
pub trait OrdersStore: Send + Sync {
    /// Persists a new order in `CREATED` status.
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, StoreError>;

    /// Retrieve a single order with its lines.
    async fn get_order(&self, order: OrderUuid) -> Result<OrderRecord, StoreError>;

    /// A user's orders, newest first.
    async fn list_orders_for_user(&self, user: UserUuid) -> Result<Vec<OrderRecord>, StoreError>;

    /// Every order, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, StoreError>;

    /// Compare-and-set update of status and timeline.
    ///
    /// Fails with [`StoreError::Conflict`] unless the stored status is still
    /// `expected`. Timestamps already stored are kept; only empty ones are
    /// filled from `order.timeline`. Lines are never rewritten.
    async fn update_order(
        &self,
        order: OrderRecord,
        expected: OrderStatus,
    ) -> Result<OrderRecord, StoreError>;
}
