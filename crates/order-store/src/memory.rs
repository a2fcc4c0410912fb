use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    OrderStoreError, Result,
    store::{NewOrder, OrderStore, StatusTransition},
};

/// In-memory order store.
///
/// Backs tests and the default binary wiring; provides the same
/// compare-and-swap semantics as the PostgreSQL implementation with all
/// mutation under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns a snapshot of all stored orders, oldest first.
    pub async fn all_orders(&self) -> Vec<Order> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|o| o.created_at);
        all
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }

    /// Test hook: rewinds an order's `updated_at` so it qualifies for a
    /// sweep without actually waiting out the confirmation timeout.
    pub async fn backdate_updated_at(&self, order_id: OrderId, updated_at: DateTime<Utc>) {
        if let Some(order) = self.orders.write().await.get_mut(&order_id) {
            order.updated_at = updated_at;
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let record = Order {
            id: OrderId::new(),
            user_id: order.user_id,
            items: order.items,
            total: order.total,
            status: OrderStatus::Pending,
            gateway_intent_id: None,
            gateway_payment_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut orders = self.orders.write().await;
        orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn transition(&self, order_id: OrderId, transition: StatusTransition) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(OrderStoreError::NotFound(order_id))?;

        if order.status != transition.expected {
            return Err(OrderStoreError::StatusConflict {
                order_id,
                expected: transition.expected,
                actual: order.status,
            });
        }

        // A charge id may be written at most once.
        if transition.gateway_payment_id.is_some() && order.gateway_payment_id.is_some() {
            return Err(OrderStoreError::StatusConflict {
                order_id,
                expected: transition.expected,
                actual: order.status,
            });
        }

        order.status = transition.target;
        if let Some(intent_id) = transition.gateway_intent_id {
            order.gateway_intent_id = Some(intent_id);
        }
        if let Some(payment_id) = transition.gateway_payment_id {
            order.gateway_payment_id = Some(payment_id);
        }
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn find_awaiting_confirmation_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut stuck: Vec<Order> = orders
            .values()
            .filter(|o| o.status == OrderStatus::AwaitingConfirmation && o.updated_at < cutoff)
            .cloned()
            .collect();
        stuck.sort_by_key(|o| o.updated_at);
        stuck.truncate(limit);
        Ok(stuck)
    }
}
