//! Invoices store.

use async_trait::async_trait;
use mockall::automock;
use tracing::{Span, info};

use crate::{
    database::Db,
    domain::{
        errors::StoreError,
        invoices::{data::NewInvoice, records::InvoiceRecord, repository::PgInvoicesRepository},
        orders::records::OrderUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgInvoicesStore {
    db: Db,
    repository: PgInvoicesRepository,
}

impl PgInvoicesStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgInvoicesRepository::new(),
        }
    }
}

#[async_trait]
impl InvoicesStore for PgInvoicesStore {
    async fn get_invoice_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Option<InvoiceRecord>, StoreError> {
        let mut tx = self.db.begin().await?;

        let invoice = self.repository.get_invoice_for_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(invoice)
    }

    #[tracing::instrument(
        name = "invoices.store.issue_invoice",
        skip(self, invoice),
        fields(order_uuid = %invoice.order_uuid, total = %invoice.total, issued),
        err
    )]
    async fn issue_invoice(&self, invoice: NewInvoice) -> Result<InvoiceRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let issued = self.repository.create_invoice(&mut tx, &invoice).await?;

        let stored = self
            .repository
            .get_invoice_for_order(&mut tx, invoice.order_uuid)
            .await?
            .ok_or(StoreError::NotFound)?;

        tx.commit().await?;

        Span::current().record("issued", issued);

        if issued {
            info!(invoice_uuid = %stored.uuid, "issued invoice");
        }

        Ok(stored)
    }
}

/// Invoices, one per paid order.
#[automock]
#[async_trait]
pub trait InvoicesStore: Send + Sync {
    async fn get_invoice_for_order(
        &self,
        order: OrderUuid,
    ) -> Result<Option<InvoiceRecord>, StoreError>;

    /// Stores `invoice` unless its order already has one, and returns the
    /// stored invoice either way.
    async fn issue_invoice(&self, invoice: NewInvoice) -> Result<InvoiceRecord, StoreError>;
}
