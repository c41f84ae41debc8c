//! Checkout: cart to order.

use fulfil::{money::Quantity, status::OrderStatus};
use smallvec::SmallVec;
use tracing::{Span, error, info, warn};

use crate::{
    domain::{
        orders::{
            data::NewOrder,
            records::{OrderLineRecord, OrderRecord, OrderUuid},
        },
        products::records::ProductUuid,
        users::UserUuid,
    },
    lifecycle::{OrderError, OrderLifecycle},
};

type Reservations = SmallVec<[(ProductUuid, Quantity); 8]>;

impl OrderLifecycle {
    /// Turns the user's cart into a `CREATED` order.
    ///
    /// Each line's stock is reserved in cart order and its product name and
    /// price are copied onto the order line. If any reservation fails the
    /// ones already taken are released and the cart is left as it was.
    /// Once the order exists exactly the ordered quantities leave the cart;
    /// anything added meanwhile stays there.
    ///
    /// # Errors
    ///
    /// - [`OrderError::EmptyCart`]
    /// - [`OrderError::InsufficientStock`]: a product is missing, inactive
    ///   or short of stock.
    /// - [`OrderError::Storage`]
    #[tracing::instrument(
        name = "lifecycle.checkout",
        skip(self),
        fields(user_uuid = %user, order_uuid, total),
        err
    )]
    pub async fn checkout(&self, user: UserUuid) -> Result<OrderRecord, OrderError> {
        let _guard = self.user_locks.lock(user).await;

        let cart = self.stores.carts.get_cart(user).await?;

        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let mut reserved = Reservations::new();
        let mut lines = Vec::with_capacity(cart.items.len());

        for item in &cart.items {
            let product = match self
                .stores
                .products
                .reserve(item.product_uuid, item.quantity)
                .await
            {
                Ok(Some(product)) => product,
                Ok(None) => {
                    self.release_reserved(&reserved).await;

                    let product = self.product_label(item.product_uuid).await;

                    warn!(
                        product_uuid = %item.product_uuid,
                        "checkout rejected, insufficient stock"
                    );

                    return Err(OrderError::InsufficientStock { product });
                }
                Err(error) => {
                    self.release_reserved(&reserved).await;

                    return Err(error.into());
                }
            };

            reserved.push((item.product_uuid, item.quantity));

            lines.push(OrderLineRecord {
                product_uuid: product.uuid,
                name: product.name,
                unit_price: product.price,
                quantity: item.quantity,
            });
        }

        let new_order = NewOrder {
            uuid: OrderUuid::new(),
            user_uuid: user,
            lines,
            created_at: self.clock.now(),
        };

        let order = match self.stores.orders.create_order(new_order).await {
            Ok(order) => order,
            Err(error) => {
                self.release_reserved(&reserved).await;

                return Err(error.into());
            }
        };

        if let Err(cart_error) = self.stores.carts.remove_items(user, &reserved).await {
            error!(
                order_uuid = %order.uuid,
                error = %cart_error,
                "failed to empty cart, abandoning order"
            );

            self.abandon(order).await;

            return Err(cart_error.into());
        }

        let span = Span::current();
        span.record("order_uuid", tracing::field::display(order.uuid));
        span.record("total", tracing::field::display(order.total()));

        info!(line_count = order.lines.len(), "checked out");

        Ok(order)
    }

    async fn release_reserved(&self, reserved: &Reservations) {
        for (product, quantity) in reserved {
            if let Err(error) = self.stores.products.release(*product, *quantity).await {
                error!(
                    product_uuid = %product,
                    %quantity,
                    %error,
                    "failed to roll back reservation"
                );
            }
        }
    }

    /// Product name for error messages, falling back to its id.
    async fn product_label(&self, product: ProductUuid) -> String {
        match self.stores.products.get_product(product).await {
            Ok(record) => record.name,
            Err(_) => product.to_string(),
        }
    }

    /// Cancels an order whose checkout could not complete and returns its
    /// stock.
    async fn abandon(&self, order: OrderRecord) {
        if let Err(error) = self.close(order, OrderStatus::Cancelled, "checkout").await {
            error!(%error, "failed to cancel abandoned order");
        }
    }
}
