//! API server entry point.

use std::sync::Arc;

use gateway::{GatewayClient, HttpGatewayClient, MockGatewayClient};
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn build_store(config: &Config) -> Arc<dyn OrderStore> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresOrderStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using Postgres order store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory order store");
            Arc::new(InMemoryOrderStore::new())
        }
    }
}

fn build_gateway(config: &Config) -> Arc<dyn GatewayClient> {
    match &config.gateway_url {
        Some(url) => {
            let client = HttpGatewayClient::new(
                url.clone(),
                config.gateway_timeout,
                config.gateway_api_key.clone(),
            )
            .expect("failed to build gateway HTTP client");
            tracing::info!(gateway_url = %url, "using HTTP payment gateway");
            Arc::new(client)
        }
        None => {
            tracing::warn!("GATEWAY_URL not set, using mock payment gateway");
            Arc::new(MockGatewayClient::new())
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build store and gateway from config
    let store = build_store(&config).await;
    let gateway = build_gateway(&config);

    let (state, sweeper) = api::create_state(
        store,
        gateway,
        config.currency.clone(),
        config.sweeper_config(),
    );

    // 4. Start the background reconciliation sweeper
    let sweeper_task = tokio::spawn(async move { sweeper.run().await });

    // 5. Build and serve the application
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    sweeper_task.abort();
    tracing::info!("server shut down gracefully");
}
