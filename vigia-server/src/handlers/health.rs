use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::AppState;

/// Liveness probe (GET /health)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Service description (GET /)
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": "vigia-hemograma",
        "version": env!("CARGO_PKG_VERSION"),
        "profile": state.config.validation.profile_url,
        "endpoints": {
            "submit": format!("POST {}", state.config.hemograma_path()),
            "status": format!("GET {}/{{tracking_id}}", state.config.hemograma_path()),
            "health": format!("GET {}", state.config.exames_health_path()),
        }
    }))
}

/// Readiness probe including queue depth (GET /api/{version}/exames/health)
pub async fn exames_health(State(state): State<Arc<AppState>>) -> Response {
    match state.queue.count_by_status() {
        Ok(counts) => {
            let queue: Map<String, Value> = counts
                .into_iter()
                .map(|(status, count)| (status, json!(count)))
                .collect();
            Json(json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "queue": queue,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Queue health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
                .into_response()
        }
    }
}
