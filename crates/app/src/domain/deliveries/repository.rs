//! Deliveries Repository

use fulfil::status::DeliveryStatus;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::{
    columns,
    deliveries::{
        data::NewDelivery,
        records::{DeliveryRecord, DeliveryUuid},
    },
    orders::records::OrderUuid,
};

const CREATE_DELIVERY_SQL: &str = include_str!("sql/create_delivery.sql");
const GET_DELIVERY_SQL: &str = include_str!("sql/get_delivery.sql");
const GET_DELIVERY_FOR_ORDER_SQL: &str = include_str!("sql/get_delivery_for_order.sql");
const UPDATE_DELIVERY_STATUS_SQL: &str = include_str!("sql/update_delivery_status.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgDeliveriesRepository;

impl PgDeliveriesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_delivery(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        delivery: NewDelivery,
    ) -> Result<DeliveryRecord, sqlx::Error> {
        query_as::<Postgres, DeliveryRecord>(CREATE_DELIVERY_SQL)
            .bind(delivery.uuid.into_uuid())
            .bind(delivery.order_uuid.into_uuid())
            .bind(delivery.carrier)
            .bind(delivery.tracking_number)
            .bind(DeliveryStatus::Prepared.as_str())
            .bind(SqlxTimestamp::from(delivery.created_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_delivery(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        delivery: DeliveryUuid,
    ) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        query_as::<Postgres, DeliveryRecord>(GET_DELIVERY_SQL)
            .bind(delivery.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_delivery_for_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        query_as::<Postgres, DeliveryRecord>(GET_DELIVERY_FOR_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn update_delivery_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        delivery: DeliveryUuid,
        expected: DeliveryStatus,
        status: DeliveryStatus,
        at: Timestamp,
    ) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        query_as::<Postgres, DeliveryRecord>(UPDATE_DELIVERY_STATUS_SQL)
            .bind(delivery.into_uuid())
            .bind(expected.as_str())
            .bind(status.as_str())
            .bind(SqlxTimestamp::from(at))
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for DeliveryRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: DeliveryUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            carrier: row.try_get("carrier")?,
            tracking_number: row.try_get("tracking_number")?,
            status: columns::status(row, "status")?,
            created_at: columns::timestamp(row, "created_at")?,
            updated_at: columns::timestamp(row, "updated_at")?,
        })
    }
}
