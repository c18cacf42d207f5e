pub mod health;
pub mod hemograma;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use vigia_core::ErrorResponse;

use crate::correlation::CorrelationId;

/// Render an [`ErrorResponse`] tagged with the request's correlation id.
pub fn error_response(
    status: StatusCode,
    body: ErrorResponse,
    correlation_id: Option<&CorrelationId>,
) -> Response {
    let body = match correlation_id {
        Some(id) => body.with_correlation_id(id.as_str()),
        None => body,
    };
    (status, Json(body)).into_response()
}
