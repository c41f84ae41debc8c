//! Order Lifecycle Engine
//!
//! Drives an order from checkout to delivery, cancellation or refund. Every
//! operation that mutates an order runs under that order's lock, checkout
//! under the user's, so two concurrent calls never interleave their steps.
//! Stock movements rely on the products store's atomic reserve/release.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use fulfil::status::OrderStatus;
use tracing::error;

use crate::{
    clock::Clock,
    domain::{
        Stores,
        errors::StoreError,
        orders::records::{OrderLineRecord, OrderRecord, OrderUuid},
        users::{Actor, UserUuid},
    },
    payments::PaymentGateway,
};

mod cancellation;
mod checkout;
mod documents;
mod errors;
mod fulfilment;
mod locks;
mod payment;

#[cfg(test)]
mod tests;

pub use cancellation::Cancellation;
pub use errors::{Missing, OrderError};
pub use fulfilment::{DEFAULT_CARRIER, Shipment};
pub use payment::PaidOrder;

use locks::KeyedLocks;

/// The order lifecycle engine, built once per process with its
/// collaborators.
pub struct OrderLifecycle {
    stores: Stores,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    user_locks: KeyedLocks<UserUuid>,
    order_locks: KeyedLocks<OrderUuid>,
}

impl Debug for OrderLifecycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OrderLifecycle")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl OrderLifecycle {
    #[must_use]
    pub fn new(stores: Stores, gateway: Arc<dyn PaymentGateway>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            gateway,
            clock,
            user_locks: KeyedLocks::default(),
            order_locks: KeyedLocks::default(),
        }
    }

    async fn load_order(&self, order: OrderUuid) -> Result<OrderRecord, OrderError> {
        match self.stores.orders.get_order(order).await {
            Ok(order) => Ok(order),
            Err(StoreError::NotFound) => Err(OrderError::NotFound(Missing::Order)),
            Err(error) => Err(error.into()),
        }
    }

    /// Loads `order` if `actor` owns it or is an admin.
    async fn load_order_for(
        &self,
        actor: Actor,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrderError> {
        let order = self.load_order(order).await?;

        if !actor.can_access(order.user_uuid) {
            return Err(OrderError::Forbidden);
        }

        Ok(order)
    }

    /// Moves `order` to `to`, stamping the matching timestamp, as a
    /// compare-and-set on its current status.
    async fn advance(
        &self,
        mut order: OrderRecord,
        to: OrderStatus,
        action: &'static str,
    ) -> Result<OrderRecord, OrderError> {
        let from = order.status;

        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidState {
                action,
                status: from,
            });
        }

        order.status = to;
        order.timeline.stamp(to, self.clock.now());

        Ok(self.stores.orders.update_order(order, from).await?)
    }

    /// Returns the order's stock, then moves it to `to`.
    ///
    /// An order keeps its reservation until it is closed: if the release
    /// fails nothing is changed, and if the move fails the stock is taken
    /// back.
    async fn close(
        &self,
        order: OrderRecord,
        to: OrderStatus,
        action: &'static str,
    ) -> Result<OrderRecord, OrderError> {
        let lines = order.lines.clone();

        self.release_lines(&lines).await?;

        match self.advance(order, to, action).await {
            Ok(order) => Ok(order),
            Err(advance_error) => {
                self.reclaim_lines(&lines).await;

                Err(advance_error)
            }
        }
    }

    /// Puts every line's quantity back into stock, all or nothing: when a
    /// release fails the lines already released are reserved again.
    async fn release_lines(&self, lines: &[OrderLineRecord]) -> Result<(), OrderError> {
        for (released, line) in lines.iter().enumerate() {
            if let Err(release_error) = self
                .stores
                .products
                .release(line.product_uuid, line.quantity)
                .await
            {
                error!(
                    product_uuid = %line.product_uuid,
                    quantity = %line.quantity,
                    error = %release_error,
                    "failed to release stock"
                );

                self.reclaim_lines(lines.get(..released).unwrap_or_default())
                    .await;

                return Err(release_error.into());
            }
        }

        Ok(())
    }

    /// Reserves released lines again. Failures are logged, never returned.
    async fn reclaim_lines(&self, lines: &[OrderLineRecord]) {
        for line in lines {
            match self
                .stores
                .products
                .reserve(line.product_uuid, line.quantity)
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => error!(
                    product_uuid = %line.product_uuid,
                    quantity = %line.quantity,
                    "released stock was sold before it could be taken back"
                ),
                Err(reserve_error) => error!(
                    product_uuid = %line.product_uuid,
                    quantity = %line.quantity,
                    error = %reserve_error,
                    "failed to take back released stock"
                ),
            }
        }
    }
}

fn require_admin(actor: Actor) -> Result<(), OrderError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(OrderError::Forbidden)
    }
}
