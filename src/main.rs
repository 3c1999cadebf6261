//! Threat Detection Service - Main Entry Point
//!
//! Loads the classifier once, then serves threat analysis over HTTP.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use threat_detection_service::{
    api::{create_router, AppState},
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    models::{inference::InferenceEngine, loader::ModelLoader},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "threat_detection_service={},tower_http=info",
            logging.level
        ))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Threat Detection Service");
    info!(
        environment = %config.server.environment,
        auth_disabled = config.server.auth_disabled(),
        timeout_ms = config.server.request_timeout_ms,
        "Configuration loaded successfully"
    );

    // Load the classifier once and share it with the engine
    let source = ModelLoader::shared(&config.model)?;
    let engine = Arc::new(InferenceEngine::new(source, &config));

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());
    let interval_secs = config.metrics.report_interval_secs;
    if interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), engine.clone(), interval_secs);
        tokio::spawn(reporter.start());
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState::new(engine.clone(), metrics.clone(), config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Service shutting down...");
    metrics.log_summary(engine.classifier_fallbacks());

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
