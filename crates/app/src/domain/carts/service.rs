//! Carts service.

use std::sync::Arc;

use fulfil::money::{Money, Quantity};
use tracing::info;

use crate::domain::{
    carts::{errors::CartsServiceError, records::CartRecord, store::CartsStore},
    errors::StoreError,
    products::{ProductsStore, records::ProductUuid},
    users::UserUuid,
};

/// Cart operations checked against the live catalog.
#[derive(Clone)]
pub struct CartsService {
    carts: Arc<dyn CartsStore>,
    products: Arc<dyn ProductsStore>,
}

impl std::fmt::Debug for CartsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartsService").finish_non_exhaustive()
    }
}

impl CartsService {
    #[must_use]
    pub fn new(carts: Arc<dyn CartsStore>, products: Arc<dyn ProductsStore>) -> Self {
        Self { carts, products }
    }

    /// Adds `quantity` units of `product` to the user's cart.
    ///
    /// The product must exist and be active, and the merged line may not
    /// exceed the current stock. Stock is not reserved until checkout.
    ///
    /// # Errors
    ///
    /// - [`CartsServiceError::ProductNotFound`]
    /// - [`CartsServiceError::ProductInactive`]
    /// - [`CartsServiceError::InsufficientStock`]
    /// - [`CartsServiceError::Storage`]
    #[tracing::instrument(
        name = "carts.service.add_to_cart",
        skip(self),
        fields(user_uuid = %user, product_uuid = %product, quantity = %quantity),
        err
    )]
    pub async fn add_to_cart(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<CartRecord, CartsServiceError> {
        let record = match self.products.get_product(product).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => return Err(CartsServiceError::ProductNotFound),
            Err(error) => return Err(error.into()),
        };

        if !record.active {
            return Err(CartsServiceError::ProductInactive);
        }

        let cart = self.carts.get_cart(user).await?;

        let wanted = match cart.quantity_of(product) {
            Some(held) => held
                .checked_add(quantity)
                .ok_or(CartsServiceError::InsufficientStock)?,
            None => quantity,
        };

        if wanted.get() > record.stock_qty {
            return Err(CartsServiceError::InsufficientStock);
        }

        let cart = self.carts.add_item(user, product, quantity).await?;

        info!(total_quantity = %wanted, "added to cart");

        Ok(cart)
    }

    /// Removes a whole line (`None`) or some units of it.
    ///
    /// # Errors
    ///
    /// Returns [`CartsServiceError::Storage`] when the store fails.
    pub async fn remove_from_cart(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Option<Quantity>,
    ) -> Result<CartRecord, CartsServiceError> {
        Ok(self.carts.remove_item(user, product, quantity).await?)
    }

    /// # Errors
    ///
    /// Returns [`CartsServiceError::Storage`] when the store fails.
    pub async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError> {
        Ok(self.carts.get_cart(user).await?)
    }

    /// # Errors
    ///
    /// Returns [`CartsServiceError::Storage`] when the store fails.
    pub async fn clear_cart(&self, user: UserUuid) -> Result<(), CartsServiceError> {
        Ok(self.carts.clear_cart(user).await?)
    }

    /// Value of the cart at live prices. Lines whose product is gone or
    /// inactive are left out.
    ///
    /// # Errors
    ///
    /// Returns [`CartsServiceError::Storage`] when the store fails.
    pub async fn cart_total(&self, user: UserUuid) -> Result<Money, CartsServiceError> {
        let cart = self.carts.get_cart(user).await?;

        let mut total = Money::ZERO;

        for item in &cart.items {
            match self.products.get_product(item.product_uuid).await {
                Ok(product) if product.active => total = total + product.price.times(item.quantity),
                Ok(_) | Err(StoreError::NotFound) => {}
                Err(error) => return Err(error.into()),
            }
        }

        Ok(total)
    }
}
