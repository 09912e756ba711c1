use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // OAuth errors
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
    #[error("invalid_client")]
    InvalidClient,
    #[error("invalid_token: {0}")]
    InvalidToken(String),

    // Routing errors
    #[error("forbidden")]
    Forbidden,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    // Remote store errors
    /// The remote store answered with a non-2xx status.
    #[error("upstream returned {status}")]
    Upstream {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },
    #[error("network error: {0}")]
    Network(String),

    #[error("reset failed: {0}")]
    ResetFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// OAuth-style error code placed in the `error` field of the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::UnsupportedGrantType => "unsupported_grant_type",
            Error::InvalidClient => "invalid_client",
            Error::InvalidToken(_) => "invalid_token",
            Error::Forbidden => "forbidden",
            Error::NotFound(_) | Error::UnknownResource(_) => "not_found",
            Error::MethodNotAllowed(_) => "method_not_allowed",
            Error::Upstream { .. } | Error::Network(_) => "proxy_error",
            Error::ResetFailed(_) => "reset_failed",
            Error::Config(_) | Error::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_) | Error::UnsupportedGrantType => StatusCode::BAD_REQUEST,
            Error::InvalidClient | Error::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound(_) | Error::UnknownResource(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::Upstream { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            Error::InvalidRequest(msg)
            | Error::InvalidToken(msg)
            | Error::NotFound(msg)
            | Error::ResetFailed(msg) => Some(msg.clone()),
            Error::UnknownResource(name) => Some(format!("unknown resource: {}", name)),
            Error::MethodNotAllowed(method) => Some(format!("method {} not allowed", method)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidRequest(format!("invalid JSON: {}", e))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        use axum::Json;

        match self {
            // Relay the remote store's answer verbatim
            Error::Upstream {
                status,
                content_type,
                body,
            } if !body.is_empty() => {
                let mut response = (status, body).into_response();
                if let Some(content_type) = content_type {
                    response.headers_mut().insert(CONTENT_TYPE, content_type);
                }
                response
            }
            err => {
                let mut body = serde_json::json!({ "error": err.code() });
                if let Some(description) = err.description() {
                    body["error_description"] = description.into();
                }
                (err.status(), Json(body)).into_response()
            }
        }
    }
}
