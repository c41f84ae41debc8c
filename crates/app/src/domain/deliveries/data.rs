//! Deliveries Data

use jiff::Timestamp;

use crate::domain::{deliveries::records::DeliveryUuid, orders::records::OrderUuid};

/// New Delivery Data. Deliveries start out `PREPAREE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDelivery {
    pub uuid: DeliveryUuid,
    pub order_uuid: OrderUuid,
    pub carrier: String,
    pub tracking_number: String,
    pub created_at: Timestamp,
}
