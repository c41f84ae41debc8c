//! Payment Records

use fulfil::{money::Money, status::PaymentStatus};
use jiff::Timestamp;
use serde::Serialize;

use crate::{domain::orders::records::OrderUuid, uuids::TypedUuid};

/// Payment UUID
pub type PaymentUuid = TypedUuid<PaymentRecord>;

/// Payment Record
///
/// One row per payment attempt. Only the last four card digits are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub uuid: PaymentUuid,
    pub order_uuid: OrderUuid,
    pub amount: Money,
    pub status: PaymentStatus,
    pub idempotency_key: String,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub card_last4: String,
    pub contact: PaymentContact,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Contact details captured with a payment, already validated and
/// normalised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentContact {
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub street_number: Option<String>,
    pub street_name: Option<String>,
}
