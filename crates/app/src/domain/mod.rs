//! Fulfilment Domain Concerns

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use crate::database::Db;

pub mod carts;
mod columns;
pub mod deliveries;
pub mod errors;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use carts::{CartsStore, MemoryCartsStore, PgCartsStore};
use deliveries::{DeliveriesStore, MemoryDeliveriesStore, PgDeliveriesStore};
use invoices::{InvoicesStore, MemoryInvoicesStore, PgInvoicesStore};
use orders::{MemoryOrdersStore, OrdersStore, PgOrdersStore};
use payments::{MemoryPaymentsStore, PaymentsStore, PgPaymentsStore};
use products::{MemoryProductsStore, PgProductsStore, ProductsStore};

/// Every store the order lifecycle works against, behind one handle.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductsStore>,
    pub carts: Arc<dyn CartsStore>,
    pub orders: Arc<dyn OrdersStore>,
    pub payments: Arc<dyn PaymentsStore>,
    pub deliveries: Arc<dyn DeliveriesStore>,
    pub invoices: Arc<dyn InvoicesStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(db: &Db) -> Self {
        Self {
            products: Arc::new(PgProductsStore::new(db.clone())),
            carts: Arc::new(PgCartsStore::new(db.clone())),
            orders: Arc::new(PgOrdersStore::new(db.clone())),
            payments: Arc::new(PgPaymentsStore::new(db.clone())),
            deliveries: Arc::new(PgDeliveriesStore::new(db.clone())),
            invoices: Arc::new(PgInvoicesStore::new(db.clone())),
        }
    }

    /// Process-local stores, empty on creation.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            products: Arc::new(MemoryProductsStore::new()),
            carts: Arc::new(MemoryCartsStore::new()),
            orders: Arc::new(MemoryOrdersStore::new()),
            payments: Arc::new(MemoryPaymentsStore::new()),
            deliveries: Arc::new(MemoryDeliveriesStore::new()),
            invoices: Arc::new(MemoryInvoicesStore::new()),
        }
    }
}

impl Debug for Stores {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
