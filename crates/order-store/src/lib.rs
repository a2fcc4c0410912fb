//! Durable, transactional storage for orders.
//!
//! The store owns all persisted order state. Creation writes the order
//! and its items atomically; every later mutation goes through a single
//! conditional status-transition write, so concurrent writers can never
//! corrupt an order, only lose the race and observe the winner's result.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{NewOrder, OrderStore, StatusTransition};
