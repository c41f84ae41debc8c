//! Carts service errors.

use thiserror::Error;

use crate::domain::errors::StoreError;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("Produit introuvable")]
    ProductNotFound,

    #[error("Produit inactif")]
    ProductInactive,

    /// The cart would hold more units than the product has in stock.
    #[error("Stock insuffisant")]
    InsufficientStock,

    #[error("storage error")]
    Storage(#[from] StoreError),
}
