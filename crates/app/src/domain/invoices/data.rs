//! Invoices Data

use fulfil::money::Money;
use jiff::Timestamp;

use crate::domain::{
    invoices::records::{InvoiceLineRecord, InvoiceUuid},
    orders::records::{OrderRecord, OrderUuid},
    users::UserUuid,
};

/// New Invoice Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub uuid: InvoiceUuid,
    pub order_uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub lines: Vec<InvoiceLineRecord>,
    pub total: Money,
    pub issued_at: Timestamp,
}

impl NewInvoice {
    /// Freezes the order's lines into an invoice issued at `issued_at`.
    #[must_use]
    pub fn for_order(order: &OrderRecord, issued_at: Timestamp) -> Self {
        let lines = order
            .lines
            .iter()
            .map(|line| InvoiceLineRecord {
                product_uuid: line.product_uuid,
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total(),
            })
            .collect();

        Self {
            uuid: InvoiceUuid::new(),
            order_uuid: order.uuid,
            user_uuid: order.user_uuid,
            lines,
            total: order.total(),
            issued_at,
        }
    }
}
