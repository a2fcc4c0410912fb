//! Checkout error types.

use common::OrderId;
use domain::{GatewayIntentId, OrderError};
use gateway::GatewayError;
use order_store::OrderStoreError;
use thiserror::Error;

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Bad input; never retried.
    #[error("invalid order: {0}")]
    Validation(#[from] OrderError),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The gateway could not be reached while creating the intent; the
    /// order has been failed closed rather than left dangling, and the
    /// caller may retry by creating a new order.
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(#[source] GatewayError),

    /// The supplied intent id does not match the one stored on the
    /// order. Rejected loudly, never silently accepted.
    #[error("gateway intent mismatch for order {order_id}: {supplied} does not match the stored intent")]
    IntentMismatch {
        order_id: OrderId,
        supplied: GatewayIntentId,
    },

    /// Gateway error outside intent creation (outcome verification or
    /// a sweeper query).
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Order store error.
    #[error("order store error: {0}")]
    Store(#[from] OrderStoreError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
