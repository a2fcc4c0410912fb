use common::OrderId;
use domain::OrderStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The order does not exist.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The conditional write lost: the order's status was not the
    /// expected one. Carries the status another writer got there first
    /// with, so the loser can observe the winner's result.
    #[error("status conflict for order {order_id}: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A stored status value could not be parsed.
    #[error("corrupt status value for order {order_id}: {value}")]
    CorruptStatus { order_id: OrderId, value: String },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
