//! Invoice Records

use fulfil::money::{Money, Quantity};
use jiff::Timestamp;
use serde::Serialize;

use crate::{
    domain::{orders::records::OrderUuid, products::records::ProductUuid, users::UserUuid},
    uuids::TypedUuid,
};

/// Invoice UUID
pub type InvoiceUuid = TypedUuid<InvoiceRecord>;

/// Invoice Record
///
/// Issued once per paid order. Lines and total are frozen at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceRecord {
    pub uuid: InvoiceUuid,
    pub order_uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub lines: Vec<InvoiceLineRecord>,
    pub total: Money,
    pub issued_at: Timestamp,
}

/// Invoice Line Record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLineRecord {
    pub product_uuid: ProductUuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    pub line_total: Money,
}
