//! Cart Items Repository

use fulfil::money::Quantity;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    carts::records::CartItemRecord, columns, products::records::ProductUuid, users::UserUuid,
};

const GET_CART_ITEMS_SQL: &str = include_str!("sql/get_cart_items.sql");
const ADD_CART_ITEM_SQL: &str = include_str!("sql/add_cart_item.sql");
const DELETE_CART_ITEM_SQL: &str = include_str!("sql/delete_cart_item.sql");
const DECREMENT_CART_ITEM_SQL: &str = include_str!("sql/decrement_cart_item.sql");
const CLEAR_CART_SQL: &str = include_str!("sql/clear_cart.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartItemsRepository;

impl PgCartItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_cart_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Vec<CartItemRecord>, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(GET_CART_ITEMS_SQL)
            .bind(user.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn add_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<(), sqlx::Error> {
        query(ADD_CART_ITEM_SQL)
            .bind(user.into_uuid())
            .bind(product.into_uuid())
            .bind(i64::from(quantity.get()))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Deletes the line outright (`None`) or when `quantity` covers all of it.
    pub(crate) async fn delete_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        product: ProductUuid,
        quantity: Option<Quantity>,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_ITEM_SQL)
            .bind(user.into_uuid())
            .bind(product.into_uuid())
            .bind(quantity.map(|quantity| i64::from(quantity.get())))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn decrement_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DECREMENT_CART_ITEM_SQL)
            .bind(user.into_uuid())
            .bind(product.into_uuid())
            .bind(i64::from(quantity.get()))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn clear_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(CLEAR_CART_SQL)
            .bind(user.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CartItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            quantity: columns::quantity(row, "quantity")?,
            added_at: columns::timestamp(row, "added_at")?,
        })
    }
}
