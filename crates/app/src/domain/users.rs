//! Users
//!
//! Accounts live with the identity provider; the store only keeps their ids.

use serde::{Deserialize, Serialize};

use crate::uuids::TypedUuid;

/// Marker for user ids.
#[derive(Debug, Clone, Copy)]
pub struct User;

/// User UUID
pub type UserUuid = TypedUuid<User>;

/// The authenticated caller of an operation, as vouched for by the identity
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user: UserUuid,
    pub is_admin: bool,
}

impl Actor {
    #[must_use]
    pub const fn customer(user: UserUuid) -> Self {
        Self {
            user,
            is_admin: false,
        }
    }

    #[must_use]
    pub const fn admin(user: UserUuid) -> Self {
        Self {
            user,
            is_admin: true,
        }
    }

    /// Whether this actor may act on a resource owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: UserUuid) -> bool {
        self.is_admin || self.user == owner
    }
}
