//! Imar staging server - main entry point

use anyhow::Result;
use axum::{extract::DefaultBodyLimit, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use imar_common::logging::{init_logging, LogConfig};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use imar_server::{
    config::Config,
    features::{self, FeatureState},
    middleware,
    stores::{HttpLocationResolver, HttpMosqueStore, InMemoryStagingStore, RemoteApi},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::from_env().unwrap_or_else(|_| {
        LogConfig::default()
            .with_file_prefix("imar-server")
            .with_filter("imar_server=debug,tower_http=debug,axum=trace")
    });

    init_logging(&log_config)?;

    info!("Starting imar staging server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Remote platform API clients
    let api = RemoteApi::new(&config.upstream)?;
    info!(upstream = %config.upstream.base_url, "Upstream API client initialized");

    let state = FeatureState {
        staging: Arc::new(InMemoryStagingStore::new()),
        locations: Arc::new(HttpLocationResolver::new(api.clone())),
        mosques: Arc::new(HttpMosqueStore::new(api)),
        inflight: features::staging::InFlight::new(),
        import: config.import.clone(),
    };

    // Build the application router
    let app = create_router(state, &config);

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: FeatureState, config: &Config) -> Router {
    let body_limit = config.import.max_file_size_bytes;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", features::router(state))
        // Apply layers from innermost to outermost
        .layer(DefaultBodyLimit::max(body_limit + 64 * 1024))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Wait for SIGTERM or Ctrl-C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
