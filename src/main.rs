use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_ingest::api::{self, IngestionHandler};
use order_ingest::config::Config;
use order_ingest::messaging::Publisher;
use order_ingest::metrics::{self, Metrics};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter, e.g. RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_ingest=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order ingestion service");

    // === 1. Configuration: any failure here aborts startup ===
    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration, refusing to start");
        e
    })?;

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let registry = metrics.registry().clone();

    let publisher = Publisher::create(&config.publisher, &metrics).map_err(|e| {
        tracing::error!(error = %e, "Failed to create publisher, refusing to start");
        e
    })?;

    // === 3. HTTP API ===
    let handler = web::Data::new(IngestionHandler::new(
        Arc::new(publisher),
        metrics,
        config.retry.clone(),
    )
    .with_max_body_bytes(config.max_body_bytes));

    tracing::info!(
        port = config.port,
        topic = %config.publisher.destination_id,
        "Listening for orders on http://0.0.0.0:{}/orders",
        config.port
    );

    let api_server = HttpServer::new(move || {
        App::new()
            .app_data(handler.clone())
            .configure(api::configure)
    })
    .bind(("0.0.0.0", config.port))?
    .run();

    tokio::try_join!(api_server, metrics::start_metrics_server(registry, config.metrics_port))?;

    tracing::info!("Shutdown complete");
    Ok(())
}
