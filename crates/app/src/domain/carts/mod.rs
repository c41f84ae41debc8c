//! Carts

pub mod errors;
mod memory;
pub mod records;
mod repository;
mod service;
mod store;

pub use errors::CartsServiceError;
pub use memory::MemoryCartsStore;
pub use service::CartsService;
pub use store::*;
