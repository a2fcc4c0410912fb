use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{
    GatewayIntentId, GatewayPaymentId, Money, Order, OrderError, OrderItem, OrderStatus,
    total_price,
};

use crate::Result;

/// Input for creating an order. The total is derived from the items at
/// construction, so a stored order can never disagree with its items.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Money,
}

impl NewOrder {
    /// Builds a new-order record, computing the total from the items.
    /// Fails only when the total overflows the cent representation.
    ///
    /// Further item validation is the caller's concern; the store
    /// persists what it is given.
    pub fn new(user_id: UserId, items: Vec<OrderItem>) -> std::result::Result<Self, OrderError> {
        let total = total_price(&items).ok_or(OrderError::TotalOverflow)?;
        Ok(Self {
            user_id,
            items,
            total,
        })
    }
}

/// A conditional status transition: "move to `target` where the current
/// status is `expected`", optionally recording the gateway tokens that
/// the transition introduces.
///
/// Constructors cover exactly the edges of the state machine; there is
/// no way to build a transition the table does not allow.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub expected: OrderStatus,
    pub target: OrderStatus,
    pub gateway_intent_id: Option<GatewayIntentId>,
    pub gateway_payment_id: Option<GatewayPaymentId>,
}

impl StatusTransition {
    /// Pending -> AwaitingConfirmation, recording the gateway intent.
    pub fn awaiting_confirmation(intent_id: GatewayIntentId) -> Self {
        Self {
            expected: OrderStatus::Pending,
            target: OrderStatus::AwaitingConfirmation,
            gateway_intent_id: Some(intent_id),
            gateway_payment_id: None,
        }
    }

    /// AwaitingConfirmation -> Paid, recording the charge id.
    ///
    /// Stores additionally guard this write on the payment id still
    /// being absent.
    pub fn paid(payment_id: GatewayPaymentId) -> Self {
        Self {
            expected: OrderStatus::AwaitingConfirmation,
            target: OrderStatus::Paid,
            gateway_intent_id: None,
            gateway_payment_id: Some(payment_id),
        }
    }

    /// AwaitingConfirmation -> Failed (gateway declined).
    pub fn declined() -> Self {
        Self::failed_from(OrderStatus::AwaitingConfirmation)
    }

    /// `expected` -> Failed. Used for gateway-unreachable failures at
    /// creation (from Pending) and sweeper exhaustion (from
    /// AwaitingConfirmation).
    pub fn failed_from(expected: OrderStatus) -> Self {
        debug_assert!(expected.can_transition_to(OrderStatus::Failed));
        Self {
            expected,
            target: OrderStatus::Failed,
            gateway_intent_id: None,
            gateway_payment_id: None,
        }
    }

    /// `expected` -> Cancelled. Only legal from Pending or
    /// AwaitingConfirmation.
    pub fn cancelled_from(expected: OrderStatus) -> Self {
        debug_assert!(expected.can_transition_to(OrderStatus::Cancelled));
        Self {
            expected,
            target: OrderStatus::Cancelled,
            gateway_intent_id: None,
            gateway_payment_id: None,
        }
    }
}

/// Core trait for order storage implementations.
///
/// All implementations must be thread-safe; the transition operation
/// must be a single atomic compare-and-swap with no read-then-write
/// race window.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order in Pending status.
    ///
    /// The order and its items are written together or not at all.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order by ID. Returns None if it does not exist.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Applies a conditional status transition.
    ///
    /// Fails with [`OrderStoreError::StatusConflict`] when the order's
    /// current status is not `transition.expected`, carrying the actual
    /// status so the caller can observe the winning writer's result.
    /// `updated_at` advances on every applied transition.
    ///
    /// [`OrderStoreError::StatusConflict`]: crate::OrderStoreError::StatusConflict
    async fn transition(&self, order_id: OrderId, transition: StatusTransition) -> Result<Order>;

    /// Lists orders stuck in AwaitingConfirmation whose `updated_at` is
    /// older than `cutoff`, oldest first, bounded by `limit`.
    async fn find_awaiting_confirmation_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        (**self).create(order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        (**self).get(order_id).await
    }

    async fn transition(&self, order_id: OrderId, transition: StatusTransition) -> Result<Order> {
        (**self).transition(order_id, transition).await
    }

    async fn find_awaiting_confirmation_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>> {
        (**self)
            .find_awaiting_confirmation_before(cutoff, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Money;

    #[test]
    fn new_order_computes_total_from_items() {
        let items = vec![
            OrderItem::new("101", 1, Money::from_cents(34999)),
            OrderItem::new("102", 2, Money::from_cents(9999)),
        ];
        let new_order = NewOrder::new(UserId::new(), items).unwrap();
        assert_eq!(new_order.total.cents(), 54997);
    }

    #[test]
    fn new_order_rejects_overflowing_total() {
        let items = vec![OrderItem::new("101", 2, Money::from_cents(i64::MAX))];
        assert_eq!(
            NewOrder::new(UserId::new(), items).unwrap_err(),
            OrderError::TotalOverflow
        );
    }

    #[test]
    fn transition_constructors_follow_the_table() {
        let t = StatusTransition::awaiting_confirmation(GatewayIntentId::new("gi_1"));
        assert_eq!(t.expected, OrderStatus::Pending);
        assert_eq!(t.target, OrderStatus::AwaitingConfirmation);
        assert!(t.gateway_intent_id.is_some());

        let t = StatusTransition::paid(GatewayPaymentId::new("pay_1"));
        assert_eq!(t.expected, OrderStatus::AwaitingConfirmation);
        assert_eq!(t.target, OrderStatus::Paid);
        assert!(t.gateway_payment_id.is_some());

        let t = StatusTransition::declined();
        assert_eq!(t.expected, OrderStatus::AwaitingConfirmation);
        assert_eq!(t.target, OrderStatus::Failed);

        let t = StatusTransition::failed_from(OrderStatus::Pending);
        assert_eq!(t.target, OrderStatus::Failed);

        let t = StatusTransition::cancelled_from(OrderStatus::AwaitingConfirmation);
        assert_eq!(t.target, OrderStatus::Cancelled);
    }
}
