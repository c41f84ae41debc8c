//! Order lifecycle errors.

use fulfil::{status::OrderStatus, validation::ValidationError};
use thiserror::Error;

use crate::{domain::errors::StoreError, payments::GatewayError};

/// Records an operation may look up and fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("Commande non trouvée")]
    Order,

    #[error("Livraison non trouvée")]
    Delivery,
}

/// Failure of a lifecycle operation.
///
/// Business outcomes carry their user-facing message. Infrastructure
/// failures keep their cause as the error source and print a generic
/// message.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    NotFound(Missing),

    /// The order's current status does not allow `action`.
    #[error("Opération impossible ({action}) : commande au statut {status}")]
    InvalidState {
        action: &'static str,
        status: OrderStatus,
    },

    #[error("Stock insuffisant pour {product}")]
    InsufficientStock { product: String },

    #[error("Panier vide")]
    EmptyCart,

    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),

    #[error("Paiement refusé : {reason}")]
    PaymentDeclined { reason: String },

    #[error("Accès refusé")]
    Forbidden,

    /// Another process changed the order first; retrying is safe.
    #[error("Commande modifiée entre-temps, veuillez réessayer")]
    Conflict,

    #[error("storage error")]
    Storage(#[source] StoreError),

    #[error("payment gateway error")]
    Gateway(#[from] GatewayError),
}

impl OrderError {
    /// HTTP status an outer surface should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidState { .. } | Self::InsufficientStock { .. } | Self::EmptyCart => 400,
            Self::ValidationFailed(_) => 422,
            Self::PaymentDeclined { .. } => 402,
            Self::Forbidden => 403,
            Self::Conflict => 409,
            Self::Storage(_) | Self::Gateway(_) => 500,
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict => Self::Conflict,
            error => Self::Storage(error),
        }
    }
}
