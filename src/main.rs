use actix::prelude::*;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod health;
mod messaging;
mod metrics;
mod store;
mod utils;

use config::Config;
use domain::customer::CustomerService;
use health::HealthChecker;
use messaging::publisher::ClosePublisher;
use messaging::{
    CustomerEventConsumer, CustomerEventHandler, RedpandaClient, SchemaRegistryClient,
    StatusEventGateway, StatusEventPublisher,
};
use store::PgCustomerStore;
use utils::{retry_with_backoff, RetryConfig};

#[actix::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // RUST_LOG wins over LOG_LEVEL
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{},customers_service=debug", config.server.log_level))
        }))
        .init();

    tracing::info!(service = config::SERVICE_NAME, "Starting customers service");

    // === 1. Postgres ===
    tracing::info!("Connecting to Postgres...");
    let pool = retry_with_backoff(RetryConfig::startup(), |attempt| {
        let url = config.database.url.clone();
        let max_connections = config.database.max_connections;
        async move {
            tracing::debug!(attempt, "Opening connection pool");
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(&url)
                .await
        }
    })
    .await?;

    let store = PgCustomerStore::new(pool.clone());
    store.ensure_schema().await?;

    // === 2. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Message bus and status notifications ===
    let registry = Arc::new(SchemaRegistryClient::new(&config.schema_registry_url)?);
    let redpanda = Arc::new(RedpandaClient::new(config.kafka.producer_settings()));

    let gateway = Arc::new(StatusEventGateway::new(
        redpanda.clone(),
        registry.clone(),
        config.kafka.status_notifications_topic.clone(),
        metrics.clone(),
    ));
    let publisher = StatusEventPublisher::new(gateway).start();

    let service = Arc::new(CustomerService::new(
        Arc::new(store),
        Arc::new(publisher.clone()),
        metrics.clone(),
    ));

    // === 4. Inbound events ===
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handler = Arc::new(CustomerEventHandler::new(service.clone(), registry, metrics.clone()));
    let consumer_task = match CustomerEventConsumer::new(config.kafka.consumer_settings(), handler) {
        Ok(consumer) => Some(tokio::spawn(consumer.run(shutdown_rx))),
        Err(e) => {
            // HTTP API stays up without the consumer
            tracing::warn!(error = %e, "Event consumer not started");
            None
        }
    };

    // === 5. HTTP ===
    let checker = Arc::new(HealthChecker::new(service.clone()).with_message_bus(redpanda));
    let bind = (config.server.host.clone(), config.server.port);
    tracing::info!(host = %bind.0, port = bind.1, "HTTP server listening");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .app_data(web::Data::new(checker.clone()))
            .configure(api::configure)
            .route("/health", web::get().to(health::health_handler))
            .route("/metrics", web::get().to(metrics::metrics_handler))
    })
    .bind(bind)?
    .run()
    .await?;

    // === 6. Shutdown ===
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Some(task) = consumer_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Consumer task ended abnormally");
        }
    }
    if let Err(e) = publisher.send(ClosePublisher).await {
        tracing::error!(error = %e, "Failed to close status publisher");
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
