//! Delivery Records

use fulfil::status::DeliveryStatus;
use jiff::Timestamp;
use serde::Serialize;

use crate::{domain::orders::records::OrderUuid, uuids::TypedUuid};

/// Delivery UUID
pub type DeliveryUuid = TypedUuid<DeliveryRecord>;

/// Delivery Record. An order has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    pub uuid: DeliveryUuid,
    pub order_uuid: OrderUuid,
    pub carrier: String,
    pub tracking_number: String,
    pub status: DeliveryStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
