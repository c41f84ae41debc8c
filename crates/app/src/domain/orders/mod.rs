//! Orders

pub mod data;
mod memory;
pub mod records;
mod repository;
mod store;

pub use memory::MemoryOrdersStore;
pub use store::*;
