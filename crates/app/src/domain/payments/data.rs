//! Payments Data

use fulfil::{money::Money, status::PaymentStatus};
use jiff::Timestamp;

use crate::domain::{
    orders::records::OrderUuid,
    payments::records::{PaymentContact, PaymentUuid},
};

/// New Payment Data. Payments start out `PENDING`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub uuid: PaymentUuid,
    pub order_uuid: OrderUuid,
    pub amount: Money,
    pub idempotency_key: String,
    pub card_last4: String,
    pub contact: PaymentContact,
    pub created_at: Timestamp,
}

/// Payment status change, with whatever the gateway reported.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub updated_at: Timestamp,
}
