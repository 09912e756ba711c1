//! Authentication helpers for protected routes.
//!
//! Provides bearer-token extraction, the `require_token` middleware and
//! HTTP Basic client credential parsing for the token endpoint.

use crate::error::{Error, Result};
use crate::token::TokenManager;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use std::sync::Arc;

/// Token details attached to requests that passed [`require_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub scope: Vec<String>,
    pub expires_at: i64,
}

/// Extracts a bearer token from an Authorization header value.
///
/// Returns the token if present and non-empty, or None otherwise.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Decodes `Authorization: Basic` client credentials into `(id, secret)`.
pub fn extract_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

/// Middleware rejecting requests without a valid bearer token.
///
/// On success the request carries an [`Authenticated`] extension.
pub async fn require_token(
    State(tokens): State<Arc<TokenManager>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidToken("missing bearer token".to_string()))?;

    let record = tokens.validate(&token).await.inspect_err(|e| {
        tracing::warn!(path = %request.uri().path(), "rejected request: {}", e);
    })?;

    request.extensions_mut().insert(Authenticated {
        scope: record.scope,
        expires_at: record.expires_at,
    });

    Ok(next.run(request).await)
}
