//! In-memory carts store.

use async_trait::async_trait;
use fulfil::money::Quantity;
use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::domain::{
    carts::{
        records::{CartItemRecord, CartRecord},
        store::CartsStore,
    },
    errors::StoreError,
    products::records::ProductUuid,
    users::UserUuid,
};

#[derive(Debug, Default)]
pub struct MemoryCartsStore {
    carts: Mutex<FxHashMap<UserUuid, Vec<CartItemRecord>>>,
}

impl MemoryCartsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Removes `quantity` units of `product` (all of them for `None`), deleting
/// the line once nothing is left.
fn take(items: &mut Vec<CartItemRecord>, product: ProductUuid, quantity: Option<Quantity>) {
    let Some(position) = items.iter().position(|item| item.product_uuid == product) else {
        return;
    };

    let remaining = quantity.and_then(|removed| {
        items
            .get(position)
            .and_then(|item| item.quantity.get().checked_sub(removed.get()))
            .and_then(|left| Quantity::new(i64::from(left)).ok())
    });

    match (remaining, items.get_mut(position)) {
        (Some(left), Some(item)) => item.quantity = left,
        _ => {
            items.remove(position);
        }
    }
}

#[async_trait]
impl CartsStore for MemoryCartsStore {
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, StoreError> {
        let carts = self.carts.lock().await;

        Ok(CartRecord {
            user_uuid: user,
            items: carts.get(&user).cloned().unwrap_or_default(),
        })
    }

    async fn add_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<CartRecord, StoreError> {
        let mut carts = self.carts.lock().await;
        let items = carts.entry(user).or_default();

        match items.iter_mut().find(|item| item.product_uuid == product) {
            Some(item) => {
                item.quantity = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or(StoreError::InvalidData)?;
            }
            None => items.push(CartItemRecord {
                product_uuid: product,
                quantity,
                added_at: Timestamp::now(),
            }),
        }

        Ok(CartRecord {
            user_uuid: user,
            items: items.clone(),
        })
    }

    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Option<Quantity>,
    ) -> Result<CartRecord, StoreError> {
        let mut carts = self.carts.lock().await;
        let items = carts.entry(user).or_default();

        take(items, product, quantity);

        Ok(CartRecord {
            user_uuid: user,
            items: items.clone(),
        })
    }

    async fn remove_items(
        &self,
        user: UserUuid,
        items: &[(ProductUuid, Quantity)],
    ) -> Result<(), StoreError> {
        let mut carts = self.carts.lock().await;
        let lines = carts.entry(user).or_default();

        for &(product, quantity) in items {
            take(lines, product, Some(quantity));
        }

        Ok(())
    }

    async fn clear_cart(&self, user: UserUuid) -> Result<(), StoreError> {
        self.carts.lock().await.remove(&user);

        Ok(())
    }
}
