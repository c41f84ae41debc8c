//! Orders Data

use jiff::Timestamp;

use crate::domain::{
    orders::records::{OrderLineRecord, OrderUuid},
    users::UserUuid,
};

/// New Order Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub lines: Vec<OrderLineRecord>,
    pub created_at: Timestamp,
}
