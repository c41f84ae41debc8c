//! Payments

pub mod data;
mod memory;
pub mod records;
mod repository;
mod store;

pub use memory::MemoryPaymentsStore;
pub use store::*;
