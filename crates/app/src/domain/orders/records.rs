//! Order Records

use fulfil::{
    money::{Money, Quantity},
    status::OrderStatus,
    timeline::OrderTimeline,
};
use serde::Serialize;

use crate::{
    domain::{products::records::ProductUuid, users::UserUuid},
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<OrderRecord>;

/// Order Record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    pub uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub status: OrderStatus,
    pub lines: Vec<OrderLineRecord>,
    #[serde(flatten)]
    pub timeline: OrderTimeline,
}

impl OrderRecord {
    /// Sum of the line totals. Never stored.
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(OrderLineRecord::line_total).sum()
    }
}

/// Order Line Record
///
/// Name and price are copied from the product at checkout and never follow
/// later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineRecord {
    pub product_uuid: ProductUuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
}

impl OrderLineRecord {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}
