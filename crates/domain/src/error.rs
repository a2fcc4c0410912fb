//! Domain validation errors.

use thiserror::Error;

/// Errors raised when validating order input.
///
/// These are caller mistakes: they are never retried and map to 4xx at
/// the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The order has no line items.
    #[error("order must contain at least one item")]
    NoItems,

    /// An item has a non-positive quantity.
    #[error("invalid quantity {quantity} for product {product_id}: must be positive")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// An item has a negative unit price.
    #[error("invalid unit price {price_cents} for product {product_id}: must not be negative")]
    NegativePrice { product_id: String, price_cents: i64 },

    /// The order total does not fit in the cent representation.
    #[error("order total overflows the cent representation")]
    TotalOverflow,
}
