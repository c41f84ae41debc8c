//! Payments Repository

use fulfil::status::PaymentStatus;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::{
    columns,
    orders::records::OrderUuid,
    payments::{
        data::{NewPayment, PaymentUpdate},
        records::{PaymentContact, PaymentRecord, PaymentUuid},
    },
};

const CREATE_PAYMENT_SQL: &str = include_str!("sql/create_payment.sql");
const GET_PAYMENT_SQL: &str = include_str!("sql/get_payment.sql");
const LIST_PAYMENTS_FOR_ORDER_SQL: &str = include_str!("sql/list_payments_for_order.sql");
const UPDATE_PAYMENT_SQL: &str = include_str!("sql/update_payment.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPaymentsRepository;

impl PgPaymentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: NewPayment,
    ) -> Result<PaymentRecord, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(CREATE_PAYMENT_SQL)
            .bind(payment.uuid.into_uuid())
            .bind(payment.order_uuid.into_uuid())
            .bind(columns::money_to_i64("amount", payment.amount)?)
            .bind(PaymentStatus::Pending.as_str())
            .bind(payment.idempotency_key)
            .bind(payment.card_last4)
            .bind(payment.contact.postal_code)
            .bind(payment.contact.phone)
            .bind(payment.contact.street_number)
            .bind(payment.contact.street_name)
            .bind(SqlxTimestamp::from(payment.created_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: PaymentUuid,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(GET_PAYMENT_SQL)
            .bind(payment.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_payments_for_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<PaymentRecord>, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(LIST_PAYMENTS_FOR_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn update_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: PaymentUuid,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(UPDATE_PAYMENT_SQL)
            .bind(payment.into_uuid())
            .bind(expected.as_str())
            .bind(update.status.as_str())
            .bind(update.transaction_id)
            .bind(update.failure_reason)
            .bind(SqlxTimestamp::from(update.updated_at))
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for PaymentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: PaymentUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            amount: columns::money(row, "amount")?,
            status: columns::status(row, "status")?,
            idempotency_key: row.try_get("idempotency_key")?,
            transaction_id: row.try_get("transaction_id")?,
            failure_reason: row.try_get("failure_reason")?,
            card_last4: row.try_get("card_last4")?,
            contact: PaymentContact {
                postal_code: row.try_get("postal_code")?,
                phone: row.try_get("phone")?,
                street_number: row.try_get("street_number")?,
                street_name: row.try_get("street_name")?,
            },
            created_at: columns::timestamp(row, "created_at")?,
            updated_at: columns::timestamp(row, "updated_at")?,
        })
    }
}
