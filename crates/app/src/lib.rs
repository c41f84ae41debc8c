//! Fulfilment application: persistence, order lifecycle engine and process
//! wiring on top of the `fulfil` domain library.

pub mod clock;
pub mod context;
pub mod database;
pub mod domain;
pub mod lifecycle;
pub mod payments;

#[cfg(test)]
mod test;

pub mod uuids;
