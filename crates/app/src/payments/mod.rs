//! Payments

mod details;
mod gateway;

pub use details::{PaymentDetails, ValidatedPayment};
pub use gateway::*;
