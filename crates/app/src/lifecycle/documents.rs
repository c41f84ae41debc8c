//! Read-side operations: orders, payments, invoices, deliveries.

use tracing::info;

use crate::{
    domain::{
        deliveries::records::DeliveryRecord,
        invoices::{data::NewInvoice, records::InvoiceRecord},
        orders::records::{OrderRecord, OrderUuid},
        payments::records::PaymentRecord,
        users::{Actor, UserUuid},
    },
    lifecycle::{Missing, OrderError, OrderLifecycle, require_admin},
};

impl OrderLifecycle {
    /// # Errors
    ///
    /// [`OrderError::NotFound`] / [`OrderError::Forbidden`]
    pub async fn order(&self, actor: Actor, order: OrderUuid) -> Result<OrderRecord, OrderError> {
        self.load_order_for(actor, order).await
    }

    /// A user's orders, newest first. Only that user or an admin may list
    /// them.
    ///
    /// # Errors
    ///
    /// [`OrderError::Forbidden`] / [`OrderError::Storage`]
    pub async fn orders_for(
        &self,
        actor: Actor,
        user: UserUuid,
    ) -> Result<Vec<OrderRecord>, OrderError> {
        if !actor.can_access(user) {
            return Err(OrderError::Forbidden);
        }

        Ok(self.stores.orders.list_orders_for_user(user).await?)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// [`OrderError::Forbidden`] / [`OrderError::Storage`]
    pub async fn list_orders(&self, actor: Actor) -> Result<Vec<OrderRecord>, OrderError> {
        require_admin(actor)?;

        Ok(self.stores.orders.list_orders().await?)
    }

    /// Payment attempts for an order, oldest first.
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] / [`OrderError::Forbidden`]
    pub async fn payments(
        &self,
        actor: Actor,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, OrderError> {
        let order = self.load_order_for(actor, order).await?;

        Ok(self
            .stores
            .payments
            .list_payments_for_order(order.uuid)
            .await?)
    }

    /// The order's invoice, issued on first request if payment did not
    /// already issue it. Only orders that were paid at some point have one;
    /// asking again always returns the same invoice.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] / [`OrderError::Forbidden`]
    /// - [`OrderError::InvalidState`]: the order was never paid.
    #[tracing::instrument(
        name = "lifecycle.invoice",
        skip(self),
        fields(order_uuid = %order, user_uuid = %actor.user),
        err
    )]
    pub async fn invoice(&self, actor: Actor, order: OrderUuid) -> Result<InvoiceRecord, OrderError> {
        let order = self.load_order_for(actor, order).await?;

        if order.timeline.paid_at.is_none() {
            return Err(OrderError::InvalidState {
                action: "facturation",
                status: order.status,
            });
        }

        if let Some(invoice) = self.stores.invoices.get_invoice_for_order(order.uuid).await? {
            return Ok(invoice);
        }

        let invoice = self
            .stores
            .invoices
            .issue_invoice(NewInvoice::for_order(&order, self.clock.now()))
            .await?;

        info!(invoice_uuid = %invoice.uuid, "invoice issued on request");

        Ok(invoice)
    }

    /// # Errors
    ///
    /// - [`OrderError::NotFound`]: order missing or not shipped yet.
    /// - [`OrderError::Forbidden`]
    pub async fn delivery(
        &self,
        actor: Actor,
        order: OrderUuid,
    ) -> Result<DeliveryRecord, OrderError> {
        let order = self.load_order_for(actor, order).await?;

        self.stores
            .deliveries
            .get_delivery_for_order(order.uuid)
            .await?
            .ok_or(OrderError::NotFound(Missing::Delivery))
    }
}
