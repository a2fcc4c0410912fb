use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{GatewayIntentId, GatewayPaymentId, Money, Order, OrderItem, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderStoreError, Result,
    store::{NewOrder, OrderStore, StatusTransition},
};

/// PostgreSQL-backed order store.
///
/// The pool is constructed and injected by the process entry point; the
/// store never opens connections of its own.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str).ok_or(OrderStoreError::CorruptStatus {
            order_id: id,
            value: status_str,
        })?;

        Ok(Order {
            id,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            items,
            total: Money::from_cents(row.try_get("total_cents")?),
            status,
            gateway_intent_id: row
                .try_get::<Option<String>, _>("gateway_intent_id")?
                .map(GatewayIntentId::new),
            gateway_payment_id: row
                .try_get::<Option<String>, _>("gateway_payment_id")?
                .map(GatewayPaymentId::new),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    async fn load_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderItem::new(
                    row.try_get::<String, _>("product_id")?,
                    row.try_get::<i32, _>("quantity")? as u32,
                    Money::from_cents(row.try_get("unit_price_cents")?),
                ))
            })
            .collect()
    }

    async fn current_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match status {
            Some(value) => {
                let parsed =
                    OrderStatus::parse(&value).ok_or(OrderStoreError::CorruptStatus {
                        order_id,
                        value,
                    })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let id = OrderId::new();
        let now = Utc::now();

        // Order and items commit together or not at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total_cents,
                                gateway_intent_id, gateway_payment_id,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, NULL, NULL, $5, $5)
            "#,
        )
        .bind(id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(order.total.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_str())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(order_id = %id, total = %order.total, "order created");

        Ok(Order {
            id,
            user_id: order.user_id,
            items: order.items,
            total: order.total,
            status: OrderStatus::Pending,
            gateway_intent_id: None,
            gateway_payment_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, total_cents, gateway_intent_id,
                   gateway_payment_id, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(order_id).await?;
                Ok(Some(Self::row_to_order(&row, items)?))
            }
            None => Ok(None),
        }
    }

    async fn transition(&self, order_id: OrderId, transition: StatusTransition) -> Result<Order> {
        // Single conditional write; the status predicate is the
        // compare-and-swap, and a charge id can only be written into a
        // row that does not hold one yet.
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2,
                gateway_intent_id = COALESCE($3, gateway_intent_id),
                gateway_payment_id = COALESCE($4, gateway_payment_id),
                updated_at = NOW()
            WHERE id = $1
              AND status = $5
              AND ($4::TEXT IS NULL OR gateway_payment_id IS NULL)
            RETURNING id, user_id, status, total_cents, gateway_intent_id,
                      gateway_payment_id, created_at, updated_at
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(transition.target.as_str())
        .bind(transition.gateway_intent_id.as_ref().map(|i| i.as_str()))
        .bind(transition.gateway_payment_id.as_ref().map(|p| p.as_str()))
        .bind(transition.expected.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(order_id).await?;
                let order = Self::row_to_order(&row, items)?;
                tracing::debug!(
                    %order_id,
                    from = %transition.expected,
                    to = %order.status,
                    "order status transition applied"
                );
                Ok(order)
            }
            None => {
                // Lost the race or the order is gone; report which.
                metrics::counter!("order_status_conflicts_total").increment(1);
                match self.current_status(order_id).await? {
                    Some(actual) => Err(OrderStoreError::StatusConflict {
                        order_id,
                        expected: transition.expected,
                        actual,
                    }),
                    None => Err(OrderStoreError::NotFound(order_id)),
                }
            }
        }
    }

    async fn find_awaiting_confirmation_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, status, total_cents, gateway_intent_id,
                   gateway_payment_id, created_at, updated_at
            FROM orders
            WHERE status = $1 AND updated_at < $2
            ORDER BY updated_at ASC
            LIMIT $3
            "#,
        )
        .bind(OrderStatus::AwaitingConfirmation.as_str())
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let items = self.load_items(id).await?;
            orders.push(Self::row_to_order(&row, items)?);
        }
        Ok(orders)
    }
}
