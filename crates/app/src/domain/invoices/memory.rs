//! In-memory invoices store.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::domain::{
    errors::StoreError,
    invoices::{data::NewInvoice, records::InvoiceRecord, store::InvoicesStore},
    orders::records::OrderUuid,
};

#[derive(Debug, Default)]
pub struct MemoryInvoicesStore {
    invoices: Mutex<FxHashMap<OrderUuid, InvoiceRecord>>,
}

impl MemoryInvoicesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoicesStore for MemoryInvoicesStore {
    async fn get_invoice_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Option<InvoiceRecord>, StoreError> {
        Ok(self.invoices.lock().await.get(&order).cloned())
    }

    async fn issue_invoice(&self, invoice: NewInvoice) -> Result<InvoiceRecord, StoreError> {
        let mut invoices = self.invoices.lock().await;

        let stored = invoices
            .entry(invoice.order_uuid)
            .or_insert_with(|| InvoiceRecord {
                uuid: invoice.uuid,
                order_uuid: invoice.order_uuid,
                user_uuid: invoice.user_uuid,
                lines: invoice.lines,
                total: invoice.total,
                issued_at: invoice.issued_at,
            });

        Ok(stored.clone())
    }
}
