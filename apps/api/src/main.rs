use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use alerting_cell::AlertDispatcher;
use health_analysis_cell::HealthAnalyzer;
use maintenance_cell::{AnalysisScheduler, HealthAnalysisService, JsonInventory, MaintenanceHandlers};
use monitoring_cell::{MetricsClient, ZabbixBackend};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fleet health API server");

    let config = AppConfig::from_env();

    // Clients are built once here and shared by every worker.
    let backend = ZabbixBackend::new(&config.backend).context("monitoring backend client")?;
    let metrics = Arc::new(MetricsClient::new(Arc::new(backend), &config));
    let inventory = Arc::new(
        JsonInventory::load(&config.inventory_path)
            .await
            .context("asset inventory")?,
    );
    let dispatcher = Arc::new(
        AlertDispatcher::from_config(&config)
            .await
            .context("alert dispatcher")?,
    );

    let service = Arc::new(HealthAnalysisService::new(
        &config,
        inventory.clone(),
        inventory,
        metrics,
        HealthAnalyzer::from_config(&config),
        dispatcher,
    ));
    let scheduler = Arc::new(AnalysisScheduler::new(service.clone(), &config));

    let scheduler_task = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.start().await })
    };

    let handlers = Arc::new(MaintenanceHandlers::new(service, scheduler.clone()));
    let app = router::create_router(handlers).layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler_task.await?;
    info!("Fleet health API stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
