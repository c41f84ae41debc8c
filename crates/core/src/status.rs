//! Lifecycle Statuses

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A status code that does not name any known status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} status: {value}")]
pub struct UnknownStatus {
    kind: &'static str,
    value: String,
}

macro_rules! status_codes {
    ($name:ident, $kind:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $name {
            /// Every status, in lifecycle order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable storage and wire code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(UnknownStatus {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }
    };
}

/// Order status.
///
/// ```text
/// CREATED → VALIDATED → PAID → SHIPPED → DELIVERED
///    │          │         │
///    └──────────┴─────────┴──→ CANCELLED (unpaid) / REFUNDED (paid)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Checked out, stock reserved.
    Created,

    /// Approved by an administrator.
    Validated,

    /// Payment captured.
    Paid,

    /// Handed to the carrier.
    Shipped,

    /// Received by the customer.
    Delivered,

    /// Cancelled before payment.
    Cancelled,

    /// Payment returned to the customer.
    Refunded,
}

status_codes!(OrderStatus, "order", {
    Created => "CREATED",
    Validated => "VALIDATED",
    Paid => "PAID",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

impl OrderStatus {
    /// No transition leaves a terminal status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Whether the order may still be paid.
    pub const fn is_payable(self) -> bool {
        matches!(self, Self::Created | Self::Validated)
    }

    /// Whether the order may still be cancelled by its owner or an admin.
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Created | Self::Validated | Self::Paid)
    }

    /// Legal transitions.
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Created, Self::Validated | Self::Paid | Self::Cancelled)
                | (
                    Self::Validated,
                    Self::Paid | Self::Shipped | Self::Cancelled
                )
                | (Self::Paid, Self::Shipped | Self::Refunded)
                | (Self::Shipped, Self::Delivered)
        )
    }
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Recorded before the gateway answered.
    Pending,

    /// Captured by the gateway.
    Succeeded,

    /// Declined by the gateway.
    Failed,

    /// Captured, then returned.
    Refunded,
}

status_codes!(PaymentStatus, "payment", {
    Pending => "PENDING",
    Succeeded => "SUCCEEDED",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

impl PaymentStatus {
    /// Legal transitions.
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Succeeded | Self::Failed) | (Self::Succeeded, Self::Refunded)
        )
    }
}

/// Delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Parcel being prepared.
    #[serde(rename = "PREPAREE")]
    Prepared,

    /// Parcel with the carrier.
    #[serde(rename = "EN_COURS")]
    InTransit,

    /// Parcel delivered.
    #[serde(rename = "LIVREE")]
    Delivered,
}

status_codes!(DeliveryStatus, "delivery", {
    Prepared => "PREPAREE",
    InTransit => "EN_COURS",
    Delivered => "LIVREE",
});

impl DeliveryStatus {
    /// Legal transitions.
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Prepared, Self::InTransit) | (Self::InTransit, Self::Delivered)
        )
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn codes_round_trip() -> TestResult {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>()?, *status);
        }

        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>()?, *status);
        }

        for status in DeliveryStatus::ALL {
            assert_eq!(status.as_str().parse::<DeliveryStatus>()?, *status);
        }

        Ok(())
    }

    #[test]
    fn unknown_codes_are_rejected() {
        let error = "PAYEE".parse::<OrderStatus>();

        assert!(error.is_err(), "expected an error, got {error:?}");
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for from in OrderStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(
                    !from.can_transition_to(*to),
                    "{from} must not transition to {to}"
                );
            }
        }
    }

    #[test]
    fn refund_is_only_reachable_from_paid() {
        for from in OrderStatus::ALL {
            assert_eq!(
                from.can_transition_to(OrderStatus::Refunded),
                *from == OrderStatus::Paid,
                "unexpected refund edge from {from}"
            );
        }
    }

    #[test]
    fn shipping_requires_validation_or_payment() {
        assert!(!OrderStatus::Created.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Validated.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn paid_orders_cannot_be_plainly_cancelled() {
        assert!(OrderStatus::Paid.is_cancellable());
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn delivery_codes_match_storefront() {
        assert_eq!(DeliveryStatus::Prepared.to_string(), "PREPAREE");
        assert_eq!(DeliveryStatus::InTransit.to_string(), "EN_COURS");
        assert_eq!(DeliveryStatus::Delivered.to_string(), "LIVREE");
    }

    #[test]
    fn payment_transitions() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(PaymentStatus::Succeeded.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Refunded));
    }
}
