//! Order and order item records.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::gateway::{GatewayIntentId, GatewayPaymentId};
use crate::money::Money;
use crate::status::OrderStatus;

/// Product identifier (catalog reference only; the catalog itself lives
/// outside this core).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A line item in an order.
///
/// A value owned exclusively by its order; never mutated after the order
/// is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product being purchased.
    pub product_id: ProductId,

    /// Units ordered. Must be positive.
    pub quantity: u32,

    /// Price per unit in cents. Must not be negative.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price),
    /// or `None` if it overflows the cent representation.
    pub fn total_price(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }

    /// Checks the item's quantity and price constraints.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: self.product_id.to_string(),
                quantity: self.quantity,
            });
        }
        if self.unit_price.is_negative() {
            return Err(OrderError::NegativePrice {
                product_id: self.product_id.to_string(),
                price_cents: self.unit_price.cents(),
            });
        }
        Ok(())
    }
}

/// Validates an item sequence for order creation, including that the
/// total fits in the cent representation.
pub fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    for item in items {
        item.validate()?;
    }
    if total_price(items).is_none() {
        return Err(OrderError::TotalOverflow);
    }
    Ok(())
}

/// Computes the order total from its items, or `None` on overflow.
pub fn total_price(items: &[OrderItem]) -> Option<Money> {
    items.iter().try_fold(Money::zero(), |total, item| {
        total.checked_add(item.total_price()?)
    })
}

/// A persisted order.
///
/// Created once; afterwards only mutated through conditional status
/// transitions on the order store, so consumers never hold a private
/// copy across a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Opaque identity, assigned at creation.
    pub id: OrderId,

    /// Owning user (back-reference only).
    pub user_id: UserId,

    /// Line items, immutable after creation.
    pub items: Vec<OrderItem>,

    /// Total price; equals the sum over items, checked at creation and
    /// never recomputed afterwards.
    pub total: Money,

    /// Current position in the state machine.
    pub status: OrderStatus,

    /// Gateway intent token; set once on Pending -> AwaitingConfirmation.
    pub gateway_intent_id: Option<GatewayIntentId>,

    /// Gateway charge token; set exactly once, on the transition into Paid.
    pub gateway_payment_id: Option<GatewayPaymentId>,

    pub created_at: DateTime<Utc>,

    /// Advances on every status transition.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
