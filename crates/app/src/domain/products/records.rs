//! Product Records

use fulfil::money::Money;
use jiff::Timestamp;
use serde::Serialize;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: Money,
    pub stock_qty: u32,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
