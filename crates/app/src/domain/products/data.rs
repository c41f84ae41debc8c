//! Products Data

use fulfil::money::Money;

use crate::domain::products::records::ProductUuid;

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: Money,
    pub stock_qty: u32,
    pub active: bool,
}

/// Product Update Data
///
/// `None` leaves the field untouched. Stock is never updated here; it only
/// moves through reservations and releases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub active: Option<bool>,
}
