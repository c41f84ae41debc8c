//! Invoices Repository

use fulfil::money::Money;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    columns,
    invoices::{
        data::NewInvoice,
        records::{InvoiceLineRecord, InvoiceRecord, InvoiceUuid},
    },
    orders::records::OrderUuid,
    products::records::ProductUuid,
    users::UserUuid,
};

const CREATE_INVOICE_SQL: &str = include_str!("sql/create_invoice.sql");
const CREATE_INVOICE_LINE_SQL: &str = include_str!("sql/create_invoice_line.sql");
const GET_INVOICE_FOR_ORDER_SQL: &str = include_str!("sql/get_invoice_for_order.sql");
const GET_INVOICE_LINES_SQL: &str = include_str!("sql/get_invoice_lines.sql");

/// An `invoices` row, before its lines are attached.
struct InvoiceRow {
    uuid: InvoiceUuid,
    order_uuid: OrderUuid,
    user_uuid: UserUuid,
    total: Money,
    issued_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgInvoicesRepository;

impl PgInvoicesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Inserts the invoice and its lines unless the order already has one.
    /// Returns whether a row was written.
    pub(crate) async fn create_invoice(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invoice: &NewInvoice,
    ) -> Result<bool, sqlx::Error> {
        let inserted: Option<Uuid> = query(CREATE_INVOICE_SQL)
            .bind(invoice.uuid.into_uuid())
            .bind(invoice.order_uuid.into_uuid())
            .bind(invoice.user_uuid.into_uuid())
            .bind(columns::money_to_i64("total", invoice.total)?)
            .bind(SqlxTimestamp::from(invoice.issued_at))
            .fetch_optional(&mut **tx)
            .await?
            .map(|row| row.try_get("uuid"))
            .transpose()?;

        if inserted.is_none() {
            return Ok(false);
        }

        for (position, line) in invoice.lines.iter().enumerate() {
            let position = i32::try_from(position).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

            query(CREATE_INVOICE_LINE_SQL)
                .bind(invoice.uuid.into_uuid())
                .bind(position)
                .bind(line.product_uuid.into_uuid())
                .bind(&line.name)
                .bind(columns::money_to_i64("unit_price", line.unit_price)?)
                .bind(i64::from(line.quantity.get()))
                .bind(columns::money_to_i64("line_total", line.line_total)?)
                .execute(&mut **tx)
                .await?;
        }

        Ok(true)
    }

    pub(crate) async fn get_invoice_for_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Option<InvoiceRecord>, sqlx::Error> {
        let Some(row) = query_as::<Postgres, InvoiceRow>(GET_INVOICE_FOR_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_optional(&mut **tx)
            .await?
        else {
            return Ok(None);
        };

        let lines = query_as::<Postgres, InvoiceLineRecord>(GET_INVOICE_LINES_SQL)
            .bind(row.uuid.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(Some(InvoiceRecord {
            uuid: row.uuid,
            order_uuid: row.order_uuid,
            user_uuid: row.user_uuid,
            lines,
            total: row.total,
            issued_at: row.issued_at,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for InvoiceRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: InvoiceUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            total: columns::money(row, "total")?,
            issued_at: columns::timestamp(row, "issued_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for InvoiceLineRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            name: row.try_get("name")?,
            unit_price: columns::money(row, "unit_price")?,
            quantity: columns::quantity(row, "quantity")?,
            line_total: columns::money(row, "line_total")?,
        })
    }
}
