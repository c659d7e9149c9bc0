use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batchpix_core::{
    load_config, validate_config, ArtifactGenerator, Config, Notifier, ProcessingOrchestrator,
    RequestStore, SqliteRequestStore, WebhookNotifier,
};

use batchpix_server::api::create_router;
use batchpix_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("BATCHPIX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration; every section has defaults, so a missing file only
    // matters when one was explicitly requested.
    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else if std::env::var("BATCHPIX_CONFIG").is_ok() {
        anyhow::bail!("Configuration file not found: {:?}", config_path);
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Artifact directory: {:?}", config.artifacts.output_dir);

    // Create SQLite request store
    let store: Arc<dyn RequestStore> = Arc::new(
        SqliteRequestStore::new(&config.database.path)
            .context("Failed to create request store")?,
    );
    info!("Request store initialized");

    // Create webhook notifier if configured
    let notifier: Option<Arc<dyn Notifier>> = match &config.webhook {
        Some(webhook_config) => {
            info!("Initializing completion webhook notifier");
            Some(Arc::new(
                WebhookNotifier::new(webhook_config.clone())
                    .context("Failed to create webhook notifier")?,
            ))
        }
        None => {
            info!("No webhook configured");
            None
        }
    };

    // Create orchestrator
    let orchestrator = Arc::new(ProcessingOrchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&store),
        ArtifactGenerator::new(config.artifacts.clone()),
        notifier,
    ));
    orchestrator.start().await;
    info!("Processing orchestrator started");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::clone(&orchestrator),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the orchestrator; in-flight runs finish on their own
    info!("Server shutting down...");
    orchestrator.stop().await;
    info!("Orchestrator stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
