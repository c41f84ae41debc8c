//! Column conversions shared by the `PostgreSQL` repositories.

use std::str::FromStr;

use fulfil::money::{Money, Quantity};
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Row, postgres::PgRow};

fn decode_error<E>(column: &str, error: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(error),
    }
}

fn encode_error<E>(column: &str, error: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Encode(Box::new(ColumnEncodeError {
        column: column.to_string(),
        source: Box::new(error),
    }))
}

#[derive(Debug, thiserror::Error)]
#[error("cannot encode column {column}")]
struct ColumnEncodeError {
    column: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

pub(crate) fn money_to_i64(column: &str, money: Money) -> Result<i64, sqlx::Error> {
    i64::try_from(money.minor()).map_err(|e| encode_error(column, e))
}

pub(crate) fn money(row: &PgRow, column: &str) -> Result<Money, sqlx::Error> {
    let minor: i64 = row.try_get(column)?;

    Money::try_from_minor(minor).map_err(|e| decode_error(column, e))
}

pub(crate) fn quantity(row: &PgRow, column: &str) -> Result<Quantity, sqlx::Error> {
    let value: i64 = row.try_get(column)?;

    Quantity::new(value).map_err(|e| decode_error(column, e))
}

pub(crate) fn count(row: &PgRow, column: &str) -> Result<u32, sqlx::Error> {
    let value: i64 = row.try_get(column)?;

    u32::try_from(value).map_err(|e| decode_error(column, e))
}

pub(crate) fn status<S>(row: &PgRow, column: &str) -> Result<S, sqlx::Error>
where
    S: FromStr,
    S::Err: std::error::Error + Send + Sync + 'static,
{
    let code: String = row.try_get(column)?;

    code.parse().map_err(|e| decode_error(column, e))
}

pub(crate) fn timestamp(row: &PgRow, column: &str) -> Result<Timestamp, sqlx::Error> {
    Ok(row.try_get::<SqlxTimestamp, _>(column)?.to_jiff())
}

pub(crate) fn optional_timestamp(
    row: &PgRow,
    column: &str,
) -> Result<Option<Timestamp>, sqlx::Error> {
    Ok(row
        .try_get::<Option<SqlxTimestamp>, _>(column)?
        .map(SqlxTimestamp::to_jiff))
}
