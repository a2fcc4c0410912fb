//! HTTP API server with observability for the checkout core.
//!
//! Provides REST endpoints for order creation and payment finalization,
//! with structured logging (tracing) and Prometheus metrics. The binary
//! also owns the background reconciliation sweeper.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{OrderIntentService, PaymentReconciler, ReconciliationSweeper, SweeperConfig};
use gateway::GatewayClient;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: OrderStore + 'static,
    G: GatewayClient + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S, G>))
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .route("/orders/{id}/finalize", put(routes::orders::finalize::<S, G>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the application state and the background sweeper over a store
/// and gateway pair.
pub fn create_state<S, G>(
    store: S,
    gateway: G,
    currency: impl Into<String>,
    sweeper_config: SweeperConfig,
) -> (Arc<AppState<S, G>>, Arc<ReconciliationSweeper<S, G>>)
where
    S: OrderStore + Clone + 'static,
    G: GatewayClient + Clone + 'static,
{
    let state = Arc::new(AppState {
        intent_service: OrderIntentService::new(store.clone(), gateway.clone(), currency),
        reconciler: PaymentReconciler::new(store.clone(), gateway.clone()),
        store: store.clone(),
    });
    let sweeper = Arc::new(ReconciliationSweeper::new(store, gateway, sweeper_config));

    (state, sweeper)
}
