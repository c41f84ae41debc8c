//! Carts store.

use async_trait::async_trait;
use fulfil::money::Quantity;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        carts::{records::CartRecord, repository::PgCartItemsRepository},
        errors::StoreError,
        products::records::ProductUuid,
        users::UserUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsStore {
    db: Db,
    repository: PgCartItemsRepository,
}

impl PgCartsStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCartItemsRepository::new(),
        }
    }
}

#[async_trait]
impl CartsStore for PgCartsStore {
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let items = self.repository.get_cart_items(&mut tx, user).await?;

        tx.commit().await?;

        Ok(CartRecord {
            user_uuid: user,
            items,
        })
    }

    async fn add_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<CartRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        self.repository
            .add_cart_item(&mut tx, user, product, quantity)
            .await?;

        let items = self.repository.get_cart_items(&mut tx, user).await?;

        tx.commit().await?;

        Ok(CartRecord {
            user_uuid: user,
            items,
        })
    }

    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Option<Quantity>,
    ) -> Result<CartRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let deleted = self
            .repository
            .delete_cart_item(&mut tx, user, product, quantity)
            .await?;

        if let (0, Some(quantity)) = (deleted, quantity) {
            self.repository
                .decrement_cart_item(&mut tx, user, product, quantity)
                .await?;
        }

        let items = self.repository.get_cart_items(&mut tx, user).await?;

        tx.commit().await?;

        Ok(CartRecord {
            user_uuid: user,
            items,
        })
    }

    #[tracing::instrument(
        name = "carts.store.remove_items",
        skip(self, items),
        fields(user_uuid = %user, line_count = items.len()),
        err
    )]
    async fn remove_items(
        &self,
        user: UserUuid,
        items: &[(ProductUuid, Quantity)],
    ) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        for &(product, quantity) in items {
            let deleted = self
                .repository
                .delete_cart_item(&mut tx, user, product, Some(quantity))
                .await?;

            if deleted == 0 {
                self.repository
                    .decrement_cart_item(&mut tx, user, product, quantity)
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.store.clear_cart",
        skip(self),
        fields(user_uuid = %user),
        err
    )]
    async fn clear_cart(&self, user: UserUuid) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        self.repository.clear_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(())
    }
}

/// Per-user carts of product quantities.
#[automock]
#[async_trait]
pub trait CartsStore: Send + Sync {
    /// The user's cart, in the order items were first added.
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, StoreError>;

    /// Adds `quantity` units, merging with an existing line for `product`.
    async fn add_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<CartRecord, StoreError>;

    /// Removes the whole line (`None`) or `quantity` units of it; a line
    /// that drops to zero is deleted. Removing an absent line is a no-op.
    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Option<Quantity>,
    ) -> Result<CartRecord, StoreError>;

    /// Takes the given quantities out of the user's cart in one step, as
    /// [`CartsStore::remove_item`] does for a single line. Lines added or
    /// topped up since the caller read the cart keep the difference.
    async fn remove_items(
        &self,
        user: UserUuid,
        items: &[(ProductUuid, Quantity)],
    ) -> Result<(), StoreError>;

    /// Deletes every line of the user's cart.
    async fn clear_cart(&self, user: UserUuid) -> Result<(), StoreError>;
}
