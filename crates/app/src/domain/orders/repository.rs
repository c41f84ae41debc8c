//! Orders Repository

use fulfil::{status::OrderStatus, timeline::OrderTimeline};
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rustc_hash::FxHashMap;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    columns,
    orders::{
        data::NewOrder,
        records::{OrderLineRecord, OrderRecord, OrderUuid},
    },
    products::records::ProductUuid,
    users::UserUuid,
};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const CREATE_ORDER_LINE_SQL: &str = include_str!("sql/create_order_line.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const GET_ORDER_LINES_SQL: &str = include_str!("sql/get_order_lines.sql");
const LIST_ORDERS_SQL: &str = include_str!("sql/list_orders.sql");
const LIST_ORDERS_FOR_USER_SQL: &str = include_str!("sql/list_orders_for_user.sql");
const UPDATE_ORDER_SQL: &str = include_str!("sql/update_order.sql");

/// An `orders` row, before its lines are attached.
struct OrderRow {
    uuid: OrderUuid,
    user_uuid: UserUuid,
    status: OrderStatus,
    timeline: OrderTimeline,
}

impl OrderRow {
    fn with_lines(self, lines: Vec<OrderLineRecord>) -> OrderRecord {
        OrderRecord {
            uuid: self.uuid,
            user_uuid: self.user_uuid,
            status: self.status,
            lines,
            timeline: self.timeline,
        }
    }
}

/// An `order_lines` row.
struct OrderLineRow {
    order_uuid: OrderUuid,
    line: OrderLineRecord,
}

fn bind_timestamp(timestamp: Option<Timestamp>) -> Option<SqlxTimestamp> {
    timestamp.map(SqlxTimestamp::from)
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: NewOrder,
    ) -> Result<OrderRecord, sqlx::Error> {
        let row = query_as::<Postgres, OrderRow>(CREATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(order.user_uuid.into_uuid())
            .bind(OrderStatus::Created.as_str())
            .bind(SqlxTimestamp::from(order.created_at))
            .fetch_one(&mut **tx)
            .await?;

        for (position, line) in order.lines.iter().enumerate() {
            let position = i32::try_from(position).map_err(|e| sqlx::Error::ColumnDecode {
                index: "position".to_string(),
                source: Box::new(e),
            })?;

            query(CREATE_ORDER_LINE_SQL)
                .bind(order.uuid.into_uuid())
                .bind(position)
                .bind(line.product_uuid.into_uuid())
                .bind(&line.name)
                .bind(columns::money_to_i64("unit_price", line.unit_price)?)
                .bind(i64::from(line.quantity.get()))
                .execute(&mut **tx)
                .await?;
        }

        Ok(row.with_lines(order.lines))
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<OrderRecord, sqlx::Error> {
        let row = query_as::<Postgres, OrderRow>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        let mut orders = self.attach_lines(tx, vec![row]).await?;

        orders.pop().ok_or(sqlx::Error::RowNotFound)
    }

    pub(crate) async fn list_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Option<UserUuid>,
    ) -> Result<Vec<OrderRecord>, sqlx::Error> {
        let rows = match user {
            Some(user) => {
                query_as::<Postgres, OrderRow>(LIST_ORDERS_FOR_USER_SQL)
                    .bind(user.into_uuid())
                    .fetch_all(&mut **tx)
                    .await?
            }
            None => {
                query_as::<Postgres, OrderRow>(LIST_ORDERS_SQL)
                    .fetch_all(&mut **tx)
                    .await?
            }
        };

        self.attach_lines(tx, rows).await
    }

    /// Writes `order.status` and any newly stamped timestamps, provided the
    /// stored status is still `expected`. Returns `None` otherwise.
    pub(crate) async fn update_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &OrderRecord,
        expected: OrderStatus,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        let timeline = &order.timeline;

        let row = query_as::<Postgres, OrderRow>(UPDATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(expected.as_str())
            .bind(order.status.as_str())
            .bind(bind_timestamp(timeline.validated_at))
            .bind(bind_timestamp(timeline.paid_at))
            .bind(bind_timestamp(timeline.shipped_at))
            .bind(bind_timestamp(timeline.delivered_at))
            .bind(bind_timestamp(timeline.cancelled_at))
            .bind(bind_timestamp(timeline.refunded_at))
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row.map(|row| row.with_lines(order.lines.clone())))
    }

    pub(crate) async fn order_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<bool, sqlx::Error> {
        let row = query_as::<Postgres, OrderRow>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row.is_some())
    }

    async fn attach_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: Vec<OrderRow>,
    ) -> Result<Vec<OrderRecord>, sqlx::Error> {
        let uuids: Vec<Uuid> = rows.iter().map(|row| row.uuid.into_uuid()).collect();

        let line_rows = query_as::<Postgres, OrderLineRow>(GET_ORDER_LINES_SQL)
            .bind(uuids)
            .fetch_all(&mut **tx)
            .await?;

        let mut lines: FxHashMap<OrderUuid, Vec<OrderLineRecord>> = FxHashMap::default();

        for row in line_rows {
            lines.entry(row.order_uuid).or_default().push(row.line);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let order_lines = lines.remove(&row.uuid).unwrap_or_default();

                row.with_lines(order_lines)
            })
            .collect())
    }
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            status: columns::status(row, "status")?,
            timeline: OrderTimeline {
                created_at: columns::timestamp(row, "created_at")?,
                validated_at: columns::optional_timestamp(row, "validated_at")?,
                paid_at: columns::optional_timestamp(row, "paid_at")?,
                shipped_at: columns::optional_timestamp(row, "shipped_at")?,
                delivered_at: columns::optional_timestamp(row, "delivered_at")?,
                cancelled_at: columns::optional_timestamp(row, "cancelled_at")?,
                refunded_at: columns::optional_timestamp(row, "refunded_at")?,
            },
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderLineRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            line: OrderLineRecord {
                product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
                name: row.try_get("name")?,
                unit_price: columns::money(row, "unit_price")?,
                quantity: columns::quantity(row, "quantity")?,
            },
        })
    }
}
