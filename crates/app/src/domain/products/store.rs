//! Products store.

use async_trait::async_trait;
use fulfil::money::Quantity;
use mockall::automock;
use tracing::{Span, info};

use crate::{
    database::Db,
    domain::{
        errors::StoreError,
        products::{
            data::{NewProduct, ProductUpdate},
            records::{ProductRecord, ProductUuid},
            repository::PgProductsRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgProductsStore {
    db: Db,
    repository: PgProductsRepository,
}

impl PgProductsStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProductsRepository::new(),
        }
    }
}

#[async_trait]
impl ProductsStore for PgProductsStore {
    async fn list_products(&self, active_only: bool) -> Result<Vec<ProductRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let products = self.repository.list_products(&mut tx, active_only).await?;

        tx.commit().await?;

        Ok(products)
    }

    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    #[tracing::instrument(
        name = "products.store.create_product",
        skip(self, product),
        fields(product_uuid = %product.uuid, stock_qty = product.stock_qty),
        err
    )]
    async fn create_product(&self, product: NewProduct) -> Result<ProductRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_product(&mut tx, product).await?;

        tx.commit().await?;

        info!(product_uuid = %created.uuid, "created product");

        Ok(created)
    }

    #[tracing::instrument(
        name = "products.store.update_product",
        skip(self, update),
        fields(product_uuid = %product),
        err
    )]
    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let updated = self
            .repository
            .update_product(&mut tx, product, update)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(
        name = "products.store.reserve",
        skip(self),
        fields(
            product_uuid = %product,
            quantity = %quantity,
            stock_qty = tracing::field::Empty
        ),
        err
    )]
    async fn reserve(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let reserved = self
            .repository
            .reserve_stock(&mut tx, product, quantity)
            .await?;

        tx.commit().await?;

        if let Some(record) = &reserved {
            Span::current().record("stock_qty", record.stock_qty);
        }

        Ok(reserved)
    }

    #[tracing::instrument(
        name = "products.store.release",
        skip(self),
        fields(
            product_uuid = %product,
            quantity = %quantity,
            stock_qty = tracing::field::Empty
        ),
        err
    )]
    async fn release(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let released = self
            .repository
            .release_stock(&mut tx, product, quantity)
            .await?;

        tx.commit().await?;

        if let Some(record) = &released {
            Span::current().record("stock_qty", record.stock_qty);
        }

        Ok(released)
    }
}

/// Catalog and stock store.
///
/// `reserve` and `release` are each a single atomic step on one product:
/// concurrent reservations can never drive stock below zero.
#[automock]
#[async_trait]
pub trait ProductsStore: Send + Sync {
    /// Lists products, optionally only the active ones.
    async fn list_products(&self, active_only: bool) -> Result<Vec<ProductRecord>, StoreError>;

    /// Retrieve a single product.
    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, StoreError>;

    /// Creates a new product.
    async fn create_product(&self, product: NewProduct) -> Result<ProductRecord, StoreError>;

    /// Updates name, price or active flag.
    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, StoreError>;

    /// Takes `quantity` units out of stock.
    ///
    /// Returns `None`, leaving the product untouched, when it is missing,
    /// inactive or holds fewer than `quantity` units. A reservation that
    /// empties the stock deactivates the product.
    async fn reserve(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError>;

    /// Puts `quantity` units back into stock.
    ///
    /// A product that was inactive at zero stock is reactivated. Returns
    /// `None` for a missing product.
    async fn release(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError>;
}
