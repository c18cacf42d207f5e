use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use vigia_core::ErrorResponse;

use super::error_response;
use crate::auth::AuthUser;
use crate::correlation::CorrelationId;
use crate::service::IngestError;
use crate::AppState;

/// Read and parse the JSON body of a submission
async fn extract_body(
    request: Request,
    correlation_id: Option<&CorrelationId>,
) -> Result<Value, Response> {
    let bytes = request
        .into_body()
        .collect()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to read request body");
            error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INVALID_JSON", "Failed to read request body"),
                correlation_id,
            )
        })?
        .to_bytes();

    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("INVALID_JSON", format!("Malformed JSON: {}", e)),
            correlation_id,
        )
    })
}

/// Authenticated submitter, `anonymous` when auth is disabled
fn client_id(request: &Request) -> String {
    request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.client_id.clone())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Submit a hemogram (POST /api/{version}/exames/hemograma)
pub async fn submit(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .cloned()
        .unwrap_or_else(|| CorrelationId(Uuid::new_v4().to_string()));
    let client_id = client_id(&request);

    let bundle = match extract_body(request, Some(&correlation_id)).await {
        Ok(bundle) => bundle,
        Err(response) => return response,
    };

    match state.service.ingest(bundle, correlation_id.as_str()) {
        Ok(accepted) => {
            tracing::info!(
                client_id = %client_id,
                tracking_id = %accepted.tracking_id,
                "Submission accepted"
            );
            (StatusCode::ACCEPTED, Json(accepted)).into_response()
        }
        Err(IngestError::Rejected(errors)) => error_response(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("INVALID_FHIR_STRUCTURE", "FHIR Bundle failed validation")
                .with_errors(errors),
            Some(&correlation_id),
        ),
        Err(IngestError::Queue(e)) => {
            tracing::error!(error = %e, "Failed to enqueue hemogram");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("QUEUE_UNAVAILABLE", "Hemogram could not be queued, retry later"),
                Some(&correlation_id),
            )
        }
        Err(e @ IngestError::Message(_)) => {
            tracing::error!(error = %e, "Failed to build queue message");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_SERVER_ERROR", "Internal server error"),
                Some(&correlation_id),
            )
        }
    }
}

/// Processing status of a submission (GET /api/{version}/exames/hemograma/{tracking_id})
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
    correlation_id: Option<Extension<CorrelationId>>,
) -> Response {
    let correlation_id = correlation_id.map(|Extension(id)| id);
    let not_found = || {
        error_response(
            StatusCode::NOT_FOUND,
            ErrorResponse::new("NOT_FOUND", format!("Unknown tracking id: {}", tracking_id)),
            correlation_id.as_ref(),
        )
    };

    let Ok(id) = Uuid::parse_str(&tracking_id) else {
        return not_found();
    };

    match state.queue.status(&id) {
        Ok(Some(status)) => Json(json!({
            "tracking_id": id,
            "status": status,
        }))
        .into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read queue status");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("QUEUE_UNAVAILABLE", "Queue status unavailable"),
                correlation_id.as_ref(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthType;
    use axum::body::Body;

    #[test]
    fn test_client_id_from_auth_extension() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_id(&request), "anonymous");

        request
            .extensions_mut()
            .insert(AuthUser::new("lacen-go".to_string(), AuthType::ApiKey));
        assert_eq!(client_id(&request), "lacen-go");
    }
}
