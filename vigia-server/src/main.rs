//! vigia-server entry point

use std::sync::Arc;
use vigia_queue::SqliteQueue;

use vigia_server::{build_router, config::ServerConfig, logging, relay::OutboxRelay, AppState};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match ServerConfig::load(
        std::path::Path::new("config.yaml")
            .exists()
            .then_some("config.yaml"),
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.yaml: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    if let Err(e) = logging::init(&config.log) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::info!("Starting vigia-server...");

    if let Some(parent) = config.queue.db_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        tracing::error!("Failed to create queue directory: {}", e);
        std::process::exit(1);
    }

    let queue = SqliteQueue::open(&config.queue.db_path, config.queue.message_group_id.clone())
        .unwrap_or_else(|e| {
            tracing::error!("Failed to open queue: {}", e);
            std::process::exit(1);
        })
        .with_max_attempts(config.queue.max_attempts);
    let queue = Arc::new(queue);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config.clone(), queue.clone()).unwrap_or_else(|e| {
        tracing::error!("Invalid validation settings: {}", e);
        std::process::exit(1);
    });
    let state = Arc::new(state);

    tracing::info!(
        profile = %config.validation.profile_url,
        required_items = config.validation.required_item_count,
        "Validation configured"
    );

    tracing::info!(
        "Auth: {}",
        if config.auth.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    match OutboxRelay::new(queue, config.relay.clone()) {
        Some(relay) => {
            relay.spawn();
        }
        None => tracing::info!("Relay: disabled"),
    }

    // Build router
    let app = build_router(state);

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Server error: {}", e);
        });

    tracing::info!("Server shut down gracefully");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
