use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation};
use serde::Deserialize;
use std::sync::Arc;
use vigia_core::ErrorResponse;

use crate::config::{AuthSettings, JwtSettings};
use crate::correlation::CorrelationId;
use crate::AppState;

/// Authenticated client information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub client_id: String,
    pub auth_type: AuthType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthType {
    ApiKey,
    Jwt,
}

impl AuthUser {
    pub fn new(client_id: String, auth_type: AuthType) -> Self {
        Self {
            client_id,
            auth_type,
        }
    }
}

/// Only the subject is read. Registered claims are checked by `Validation`.
#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: Option<String>,
}

/// 401 with the uniform error body and a Bearer challenge.
pub fn unauthorized(message: impl Into<String>, correlation_id: Option<&CorrelationId>) -> Response {
    let mut body = ErrorResponse::new("UNAUTHORIZED", message);
    if let Some(id) = correlation_id {
        body = body.with_correlation_id(id.as_str());
    }
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(body),
    )
        .into_response()
}

fn is_public_path(state: &AppState, path: &str) -> bool {
    path == "/" || path == "/health" || path == state.config.exames_health_path()
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    // Skip auth if disabled
    if !state.config.auth.enabled {
        return Ok(next.run(request).await);
    }

    if is_public_path(&state, request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let correlation_id = request.extensions().get::<CorrelationId>().cloned();

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(auth_header) = auth_header else {
        return Err(unauthorized(
            "Missing Authorization header",
            correlation_id.as_ref(),
        ));
    };

    let auth_user = authenticate_bearer(&state.config.auth, auth_header).map_err(|reason| {
        tracing::warn!(reason = %reason, "Authentication failed");
        unauthorized(reason, correlation_id.as_ref())
    })?;

    tracing::debug!(
        client_id = %auth_user.client_id,
        auth_type = ?auth_user.auth_type,
        "Client authenticated"
    );

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Authenticate a Bearer token (API key first, then JWT fallback)
pub fn authenticate_bearer(settings: &AuthSettings, auth_header: &str) -> Result<AuthUser, String> {
    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Err("Invalid Authorization header format. Use 'Bearer <token>'".to_string());
    };
    let token = token.trim();

    // Try API key match first
    for api_key in &settings.api_keys {
        if api_key.key == token {
            return Ok(AuthUser::new(api_key.name.clone(), AuthType::ApiKey));
        }
    }

    if let Some(ref jwt_settings) = settings.jwt
        && !jwt_settings.secret.is_empty()
    {
        return authenticate_jwt(jwt_settings, token);
    }

    Err("Invalid API key".to_string())
}

/// Verify an HS256 token. Expiry is always enforced.
fn authenticate_jwt(jwt_settings: &JwtSettings, token: &str) -> Result<AuthUser, String> {
    let decoding_key = DecodingKey::from_secret(jwt_settings.secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);

    if let Some(ref issuer) = jwt_settings.issuer {
        validation.set_issuer(&[issuer]);
    }

    if let Some(ref audience) = jwt_settings.audience {
        validation.set_audience(&[audience]);
    } else {
        validation.validate_aud = false;
    }

    let token_data: TokenData<JwtClaims> = jsonwebtoken::decode(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid JWT: {}", e))?;

    let client_id = token_data
        .claims
        .sub
        .unwrap_or_else(|| "anonymous".to_string());

    Ok(AuthUser::new(client_id, AuthType::Jwt))
}
