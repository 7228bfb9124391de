//! Server initialization and routing

use crate::api;
use crate::bus::{self, RedisStreamBus, SubscriptionOptions};
use crate::config::Config;
use crate::grpc::{self, AuthGate, InventoryRpc, MethodRules, OrderRpc};
use crate::jwt::JwtManager;
use crate::repository::{car::CarRepositoryImpl, order::OrderRepositoryImpl};
use crate::service::{InventoryService, OrderService, StockReconciler};
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by the ops handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: MySqlPool,
    pub bus: Arc<RedisStreamBus>,
    pub prometheus: Option<PrometheusHandle>,
}

pub async fn connect_database(config: &Config) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");
    Ok(pool)
}

/// Run migrations, start the stock reconciliation subscriber and serve the
/// gated RPC routes next to the ops endpoints until ctrl-c.
pub async fn run(config: Config, prometheus: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = connect_database(&config).await?;
    crate::migration::migrate(&db_pool).await?;

    let bus = Arc::new(
        RedisStreamBus::connect(&config.redis, &config.bus)
            .await
            .context("Failed to connect to Redis")?,
    );
    bus.ensure_group(&config.bus.order_topic)
        .await
        .context("Failed to create consumer group")?;
    info!(
        topic = %config.bus.order_topic,
        group = %config.bus.consumer_group,
        consumer = %config.bus.consumer_name,
        "Connected to message bus"
    );

    let car_repo = Arc::new(CarRepositoryImpl::new(db_pool.clone()));
    let order_repo = Arc::new(OrderRepositoryImpl::new(db_pool.clone()));

    let inventory_service = Arc::new(InventoryService::new(car_repo.clone()));
    let order_service = Arc::new(OrderService::with_topic(
        order_repo,
        bus.clone(),
        config.bus.order_topic.clone(),
    ));

    let reconciler = Arc::new(StockReconciler::new(car_repo, config.bus.handler_timeout()));
    let subscription = bus::subscribe(
        bus.clone(),
        reconciler,
        SubscriptionOptions::from(&config.bus),
    );

    let auth_gate = AuthGate::new(
        MethodRules::default_rules(),
        JwtManager::new(config.jwt.clone()),
    );

    let rpc = grpc::rpc_router(
        Arc::new(OrderRpc::new(order_service)),
        Arc::new(InventoryRpc::new(inventory_service)),
        auth_gate,
    );

    let state = AppState {
        db_pool: db_pool.clone(),
        bus,
        prometheus,
    };

    let app = build_router(state, rpc);
    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    info!("HTTP server started on {}", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down stock reconciliation subscriber");
    subscription.shutdown().await;
    db_pool.close().await;
    Ok(())
}

/// Ops endpoints merged with the gated `rpc` routes
pub fn build_router(state: AppState, rpc: Router) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready))
        .route("/metrics", get(api::metrics::metrics_handler))
        .with_state(state)
        .merge(rpc)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
