//! Domain types for the checkout core.
//!
//! Defines the order record, its status state machine, money arithmetic,
//! and the gateway-facing value types that flow through reconciliation.

mod error;
mod gateway;
mod money;
mod order;
mod status;

pub use error::OrderError;
pub use gateway::{
    GatewayIntentId, GatewayOutcome, GatewayPaymentId, GatewayResult, GatewayTransactionToken,
};
pub use money::Money;
pub use order::{Order, OrderItem, ProductId, total_price, validate_items};
pub use status::OrderStatus;
