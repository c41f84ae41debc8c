//! Fulfil
//!
//! Domain primitives for order fulfilment: money and quantities, the order,
//! payment and delivery status machines, the order timeline, and the payment
//! and contact field validators. Nothing in this crate performs I/O.

pub mod money;
pub mod status;
pub mod timeline;
pub mod validation;
