//! Order Timeline

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;

/// Lifecycle timestamps of an order.
///
/// Every timestamp past `created_at` is stamped at most once and never
/// cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTimeline {
    /// Checkout time.
    pub created_at: Timestamp,

    /// Admin validation time.
    pub validated_at: Option<Timestamp>,

    /// Payment capture time.
    pub paid_at: Option<Timestamp>,

    /// Shipment time.
    pub shipped_at: Option<Timestamp>,

    /// Delivery time.
    pub delivered_at: Option<Timestamp>,

    /// Cancellation time, also set when a paid order is cancelled.
    pub cancelled_at: Option<Timestamp>,

    /// Refund time.
    pub refunded_at: Option<Timestamp>,
}

impl OrderTimeline {
    /// A fresh timeline for an order checked out at `created_at`.
    pub const fn new(created_at: Timestamp) -> Self {
        Self {
            created_at,
            validated_at: None,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
        }
    }

    /// Stamps the timestamp belonging to `status`, keeping any existing
    /// value. Returns `true` when a new value was written.
    pub fn stamp(&mut self, status: OrderStatus, at: Timestamp) -> bool {
        let slot = match status {
            OrderStatus::Created => return false,
            OrderStatus::Validated => &mut self.validated_at,
            OrderStatus::Paid => &mut self.paid_at,
            OrderStatus::Shipped => &mut self.shipped_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            OrderStatus::Cancelled => &mut self.cancelled_at,
            OrderStatus::Refunded => &mut self.refunded_at,
        };

        if slot.is_some() {
            return false;
        }

        *slot = Some(at);

        true
    }

    /// The timestamp belonging to `status`, if stamped.
    pub const fn at(&self, status: OrderStatus) -> Option<Timestamp> {
        match status {
            OrderStatus::Created => Some(self.created_at),
            OrderStatus::Validated => self.validated_at,
            OrderStatus::Paid => self.paid_at,
            OrderStatus::Shipped => self.shipped_at,
            OrderStatus::Delivered => self.delivered_at,
            OrderStatus::Cancelled => self.cancelled_at,
            OrderStatus::Refunded => self.refunded_at,
        }
    }

    /// Whether every timestamp set in `earlier` still holds the same value
    /// here.
    pub fn extends(&self, earlier: &Self) -> bool {
        OrderStatus::ALL.iter().all(|status| match earlier.at(*status) {
            Some(at) => self.at(*status) == Some(at),
            None => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use super::*;

    fn at(seconds: i64) -> TestResult<Timestamp> {
        Ok(Timestamp::from_second(1_760_000_000 + seconds)?)
    }

    #[test]
    fn stamps_are_set_once() -> TestResult {
        let mut timeline = OrderTimeline::new(at(0)?);

        assert!(timeline.stamp(OrderStatus::Paid, at(10)?));
        assert!(!timeline.stamp(OrderStatus::Paid, at(20)?));
        assert_eq!(timeline.paid_at, Some(at(10)?));

        Ok(())
    }

    #[test]
    fn created_at_is_never_restamped() -> TestResult {
        let mut timeline = OrderTimeline::new(at(0)?);

        assert!(!timeline.stamp(OrderStatus::Created, at(5)?));
        assert_eq!(timeline.created_at, at(0)?);

        Ok(())
    }

    #[test]
    fn later_timelines_extend_earlier_ones() -> TestResult {
        let earlier = {
            let mut timeline = OrderTimeline::new(at(0)?);
            timeline.stamp(OrderStatus::Paid, at(1)?);
            timeline
        };

        let mut later = earlier;
        later.stamp(OrderStatus::Cancelled, at(2)?);
        later.stamp(OrderStatus::Refunded, at(2)?);

        assert!(later.extends(&earlier), "stamping must be monotonic");

        let mut rewritten = later;
        rewritten.paid_at = Some(at(3)?);

        assert!(!rewritten.extends(&earlier), "a changed paid_at must be detected");

        Ok(())
    }
}
