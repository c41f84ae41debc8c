//! Cart Records

use fulfil::money::Quantity;
use jiff::Timestamp;
use serde::Serialize;

use crate::domain::{products::records::ProductUuid, users::UserUuid};

/// Cart Record
///
/// Every user owns exactly one cart; a user who never added anything has an
/// empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartRecord {
    pub user_uuid: UserUuid,
    pub items: Vec<CartItemRecord>,
}

impl CartRecord {
    #[must_use]
    pub fn empty(user_uuid: UserUuid) -> Self {
        Self {
            user_uuid,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity held for `product`, if any.
    #[must_use]
    pub fn quantity_of(&self, product: ProductUuid) -> Option<Quantity> {
        self.items
            .iter()
            .find(|item| item.product_uuid == product)
            .map(|item| item.quantity)
    }
}

/// Cart Item Record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemRecord {
    pub product_uuid: ProductUuid,
    pub quantity: Quantity,
    pub added_at: Timestamp,
}
