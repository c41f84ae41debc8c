//! Admin fulfilment: validation, shipping, delivery.

use fulfil::status::{DeliveryStatus, OrderStatus};
use serde::Serialize;
use tracing::info;

use crate::{
    domain::{
        deliveries::{
            data::NewDelivery,
            records::{DeliveryRecord, DeliveryUuid},
        },
        orders::records::{OrderRecord, OrderUuid},
        users::Actor,
    },
    lifecycle::{Missing, OrderError, OrderLifecycle, require_admin},
};

/// Carrier used when the admin does not name one.
pub const DEFAULT_CARRIER: &str = "POSTE";

/// An order together with its delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shipment {
    pub order: OrderRecord,
    pub delivery: DeliveryRecord,
}

/// Tracking number of an order's delivery, unique per order.
fn tracking_number(order: OrderUuid) -> String {
    format!("TRK-{}", order.into_uuid().simple()).to_ascii_uppercase()
}

impl OrderLifecycle {
    /// `CREATED` to `VALIDATED`.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`]: caller is not an admin.
    /// - [`OrderError::NotFound`] / [`OrderError::InvalidState`]
    #[tracing::instrument(
        name = "lifecycle.admin_validate",
        skip(self),
        fields(order_uuid = %order, admin_uuid = %actor.user),
        err
    )]
    pub async fn admin_validate(
        &self,
        actor: Actor,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrderError> {
        require_admin(actor)?;

        let _guard = self.order_locks.lock(order).await;

        let order = self.load_order(order).await?;

        if order.status != OrderStatus::Created {
            return Err(OrderError::InvalidState {
                action: "validation",
                status: order.status,
            });
        }

        let order = self
            .advance(order, OrderStatus::Validated, "validation")
            .await?;

        info!("order validated");

        Ok(order)
    }

    /// Hands a `VALIDATED` or `PAID` order to `carrier`.
    ///
    /// The delivery is created `PREPAREE` (or reused if an earlier attempt
    /// got that far) and moved straight to `EN_COURS`. A blank carrier
    /// falls back to [`DEFAULT_CARRIER`].
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`]: caller is not an admin.
    /// - [`OrderError::NotFound`] / [`OrderError::InvalidState`]
    #[tracing::instrument(
        name = "lifecycle.admin_ship",
        skip(self),
        fields(order_uuid = %order, admin_uuid = %actor.user),
        err
    )]
    pub async fn admin_ship(
        &self,
        actor: Actor,
        order: OrderUuid,
        carrier: Option<&str>,
    ) -> Result<Shipment, OrderError> {
        require_admin(actor)?;

        let _guard = self.order_locks.lock(order).await;

        let order = self.load_order(order).await?;

        if !matches!(order.status, OrderStatus::Validated | OrderStatus::Paid) {
            return Err(OrderError::InvalidState {
                action: "expédition",
                status: order.status,
            });
        }

        let carrier = carrier
            .map(str::trim)
            .filter(|carrier| !carrier.is_empty())
            .unwrap_or(DEFAULT_CARRIER);

        let delivery = match self
            .stores
            .deliveries
            .get_delivery_for_order(order.uuid)
            .await?
        {
            Some(delivery) => delivery,
            None => {
                self.stores
                    .deliveries
                    .create_delivery(NewDelivery {
                        uuid: DeliveryUuid::new(),
                        order_uuid: order.uuid,
                        carrier: carrier.to_string(),
                        tracking_number: tracking_number(order.uuid),
                        created_at: self.clock.now(),
                    })
                    .await?
            }
        };

        let delivery = if delivery.status == DeliveryStatus::Prepared {
            self.stores
                .deliveries
                .update_delivery_status(
                    delivery.uuid,
                    DeliveryStatus::Prepared,
                    DeliveryStatus::InTransit,
                    self.clock.now(),
                )
                .await?
        } else {
            delivery
        };

        let order = self
            .advance(order, OrderStatus::Shipped, "expédition")
            .await?;

        info!(
            carrier = %delivery.carrier,
            tracking_number = %delivery.tracking_number,
            "order shipped"
        );

        Ok(Shipment { order, delivery })
    }

    /// `SHIPPED` to `DELIVERED`; the existing delivery becomes `LIVREE`.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`]: caller is not an admin.
    /// - [`OrderError::NotFound`]: order or delivery missing.
    /// - [`OrderError::InvalidState`]
    #[tracing::instrument(
        name = "lifecycle.admin_mark_delivered",
        skip(self),
        fields(order_uuid = %order, admin_uuid = %actor.user),
        err
    )]
    pub async fn admin_mark_delivered(
        &self,
        actor: Actor,
        order: OrderUuid,
    ) -> Result<Shipment, OrderError> {
        require_admin(actor)?;

        let _guard = self.order_locks.lock(order).await;

        let order = self.load_order(order).await?;

        if order.status != OrderStatus::Shipped {
            return Err(OrderError::InvalidState {
                action: "livraison",
                status: order.status,
            });
        }

        let delivery = self
            .stores
            .deliveries
            .get_delivery_for_order(order.uuid)
            .await?
            .ok_or(OrderError::NotFound(Missing::Delivery))?;

        let delivery = if delivery.status == DeliveryStatus::Delivered {
            delivery
        } else {
            self.stores
                .deliveries
                .update_delivery_status(
                    delivery.uuid,
                    delivery.status,
                    DeliveryStatus::Delivered,
                    self.clock.now(),
                )
                .await?
        };

        let order = self
            .advance(order, OrderStatus::Delivered, "livraison")
            .await?;

        info!("order delivered");

        Ok(Shipment { order, delivery })
    }
}
