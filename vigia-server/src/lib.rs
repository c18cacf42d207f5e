//! vigia-server - hemogram ingestion API
//!
//! Receives complete blood count bundles from laboratories, validates them and
//! queues accepted ones for asynchronous processing.

pub mod auth;
pub mod config;
pub mod correlation;
pub mod handlers;
pub mod logging;
pub mod relay;
pub mod service;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use vigia_core::BundleValidator;
use vigia_queue::SqliteQueue;

use crate::service::HemogramaService;

/// Application state
pub struct AppState {
    pub config: config::ServerConfig,
    pub service: HemogramaService,
    pub queue: Arc<SqliteQueue>,
}

impl AppState {
    /// Fails when the validation settings are unusable.
    pub fn new(config: config::ServerConfig, queue: Arc<SqliteQueue>) -> vigia_core::Result<Self> {
        let validator = BundleValidator::new(config.validation.clone())?;
        let service = HemogramaService::new(validator, queue.clone());
        Ok(Self {
            config,
            service,
            queue,
        })
    }
}

fn cors_layer(settings: &config::CorsSettings) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if settings.allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Build the application router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let hemograma = state.config.hemograma_path();
    let body_limit = state.config.server.max_body_bytes;
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/", get(handlers::health::service_info))
        .route("/health", get(handlers::health::health_check))
        .route(
            &state.config.exames_health_path(),
            get(handlers::health::exames_health),
        )
        .route(&hemograma, post(handlers::hemograma::submit))
        .route(
            &format!("{}/{{tracking_id}}", hemograma),
            get(handlers::hemograma::status),
        )
        // Middleware (last added runs first)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(axum::middleware::from_fn(correlation::correlation_middleware))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
