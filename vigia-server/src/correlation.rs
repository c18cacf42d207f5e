use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub static CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Correlation id of the current request, set by [`correlation_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_request(request: &Request<Body>) -> Self {
        let supplied = request
            .headers()
            .get(&CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        match supplied {
            Some(id) => CorrelationId(id.to_string()),
            None => CorrelationId(Uuid::new_v4().to_string()),
        }
    }
}

/// Tag every request with a correlation id and echo it on the response.
pub async fn correlation_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = CorrelationId::from_request(&request);
    request.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!("request", correlation_id = %correlation_id.as_str());
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(CORRELATION_HEADER.clone(), value);
    }
    response
}
