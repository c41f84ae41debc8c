//! In-memory products store.

use async_trait::async_trait;
use fulfil::money::Quantity;
use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::domain::{
    errors::StoreError,
    products::{
        data::{NewProduct, ProductUpdate},
        records::{ProductRecord, ProductUuid},
        store::ProductsStore,
    },
};

#[derive(Debug, Default)]
pub struct MemoryProductsStore {
    products: Mutex<FxHashMap<ProductUuid, ProductRecord>>,
}

impl MemoryProductsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductsStore for MemoryProductsStore {
    async fn list_products(&self, active_only: bool) -> Result<Vec<ProductRecord>, StoreError> {
        let products = self.products.lock().await;

        let mut listed: Vec<ProductRecord> = products
            .values()
            .filter(|product| product.active || !active_only)
            .cloned()
            .collect();

        listed.sort_by_key(|product| (product.created_at, product.uuid));

        Ok(listed)
    }

    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, StoreError> {
        self.products
            .lock()
            .await
            .get(&product)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_product(&self, product: NewProduct) -> Result<ProductRecord, StoreError> {
        let mut products = self.products.lock().await;

        if products.contains_key(&product.uuid) {
            return Err(StoreError::AlreadyExists);
        }

        let now = Timestamp::now();

        let record = ProductRecord {
            uuid: product.uuid,
            name: product.name,
            price: product.price,
            stock_qty: product.stock_qty,
            active: product.active,
            created_at: now,
            updated_at: now,
        };

        products.insert(record.uuid, record.clone());

        Ok(record)
    }

    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, StoreError> {
        let mut products = self.products.lock().await;

        let record = products.get_mut(&product).ok_or(StoreError::NotFound)?;

        if let Some(name) = update.name {
            record.name = name;
        }

        if let Some(price) = update.price {
            record.price = price;
        }

        if let Some(active) = update.active {
            record.active = active;
        }

        record.updated_at = Timestamp::now();

        Ok(record.clone())
    }

    async fn reserve(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError> {
        let mut products = self.products.lock().await;

        let Some(record) = products.get_mut(&product) else {
            return Ok(None);
        };

        if !record.active || record.stock_qty < quantity.get() {
            return Ok(None);
        }

        record.stock_qty -= quantity.get();
        record.active = record.stock_qty > 0;
        record.updated_at = Timestamp::now();

        Ok(Some(record.clone()))
    }

    async fn release(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError> {
        let mut products = self.products.lock().await;

        let Some(record) = products.get_mut(&product) else {
            return Ok(None);
        };

        record.active = record.active || record.stock_qty == 0;
        record.stock_qty = record.stock_qty.saturating_add(quantity.get());
        record.updated_at = Timestamp::now();

        Ok(Some(record.clone()))
    }
}
