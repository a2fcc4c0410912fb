//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{GatewayIntentId, GatewayPaymentId, Money, OrderItem, OrderStatus};
use order_store::{
    NewOrder, OrderStore, OrderStoreError, PostgresOrderStore, StatusTransition,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn sample_order() -> NewOrder {
    NewOrder::new(
        UserId::new(),
        vec![
            OrderItem::new("101", 1, Money::from_cents(34999)),
            OrderItem::new("102", 2, Money::from_cents(9999)),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn create_writes_order_and_items_atomically() {
    let store = get_test_store().await;

    let created = store.create(sample_order()).await.unwrap();
    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.total.cents(), 54997);

    let loaded = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].product_id.as_str(), "101");
    assert_eq!(loaded.items[1].quantity, 2);
    assert_eq!(loaded.total.cents(), 54997);
}

#[tokio::test]
async fn get_missing_order_returns_none() {
    let store = get_test_store().await;
    assert!(store.get(OrderId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn transition_cas_applies_and_conflicts() {
    let store = get_test_store().await;
    let order = store.create(sample_order()).await.unwrap();

    let awaiting = store
        .transition(
            order.id,
            StatusTransition::awaiting_confirmation(GatewayIntentId::new("gi_1")),
        )
        .await
        .unwrap();
    assert_eq!(awaiting.status, OrderStatus::AwaitingConfirmation);
    assert_eq!(
        awaiting.gateway_intent_id,
        Some(GatewayIntentId::new("gi_1"))
    );
    assert!(awaiting.updated_at >= order.updated_at);

    // A write still expecting Pending must lose and see the actual status.
    let err = store
        .transition(order.id, StatusTransition::failed_from(OrderStatus::Pending))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderStoreError::StatusConflict {
            expected: OrderStatus::Pending,
            actual: OrderStatus::AwaitingConfirmation,
            ..
        }
    ));
}

#[tokio::test]
async fn paid_transition_is_terminal_and_keeps_first_charge_id() {
    let store = get_test_store().await;
    let order = store.create(sample_order()).await.unwrap();
    store
        .transition(
            order.id,
            StatusTransition::awaiting_confirmation(GatewayIntentId::new("gi_1")),
        )
        .await
        .unwrap();

    let paid = store
        .transition(order.id, StatusTransition::paid(GatewayPaymentId::new("pay_1")))
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.gateway_payment_id, Some(GatewayPaymentId::new("pay_1")));

    let err = store
        .transition(order.id, StatusTransition::paid(GatewayPaymentId::new("pay_2")))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderStoreError::StatusConflict { .. }));

    let current = store.get(order.id).await.unwrap().unwrap();
    assert_eq!(
        current.gateway_payment_id,
        Some(GatewayPaymentId::new("pay_1"))
    );
}

#[tokio::test]
async fn transition_missing_order_is_not_found() {
    let store = get_test_store().await;
    let err = store
        .transition(OrderId::new(), StatusTransition::declined())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderStoreError::NotFound(_)));
}

#[tokio::test]
async fn sweep_scan_finds_only_stale_awaiting_orders() {
    let store = get_test_store().await;

    let stuck = store.create(sample_order()).await.unwrap();
    store
        .transition(
            stuck.id,
            StatusTransition::awaiting_confirmation(GatewayIntentId::new("gi_1")),
        )
        .await
        .unwrap();

    // Backdate the stuck order past the cutoff.
    sqlx::query("UPDATE orders SET updated_at = NOW() - INTERVAL '20 minutes' WHERE id = $1")
        .bind(stuck.id.as_uuid())
        .execute(store.pool())
        .await
        .unwrap();

    let fresh = store.create(sample_order()).await.unwrap();
    store
        .transition(
            fresh.id,
            StatusTransition::awaiting_confirmation(GatewayIntentId::new("gi_2")),
        )
        .await
        .unwrap();

    // Still-Pending order never qualifies.
    store.create(sample_order()).await.unwrap();

    let cutoff = Utc::now() - chrono::Duration::minutes(15);
    let found = store
        .find_awaiting_confirmation_before(cutoff, 10)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, stuck.id);
    assert_eq!(found[0].items.len(), 2);
}

#[tokio::test]
async fn concurrent_paid_transitions_have_one_winner() {
    let store = get_test_store().await;
    let order = store.create(sample_order()).await.unwrap();
    store
        .transition(
            order.id,
            StatusTransition::awaiting_confirmation(GatewayIntentId::new("gi_1")),
        )
        .await
        .unwrap();

    let a = store.clone();
    let b = store.clone();
    let id = order.id;
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move {
            a.transition(id, StatusTransition::paid(GatewayPaymentId::new("pay_1")))
                .await
        }),
        tokio::spawn(async move {
            b.transition(id, StatusTransition::declined()).await
        }),
    );

    let results = [ra.unwrap(), rb.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let current = store.get(id).await.unwrap().unwrap();
    assert!(current.status.is_terminal());
}
