use crate::{
    auth::{Authenticated, extract_basic_credentials, require_token},
    backend::{DataBackend, MemoryBackend, QueryPairs, RemoteBackend, Resource},
    config::{BackendKind, ProxyConfig},
    error::{Error, Result},
    reset::reset_from_seed,
    seed::SeedData,
    store::{Clock, MemoryTokenStore, SystemClock, TokenStore},
    token::{GrantType, TokenManager, TokenRequest},
};
use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, patch, post},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Response header carrying the pre-pagination record count
pub const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// Mock OAuth server in front of a data backend.
///
/// Issues bearer tokens, guards the data routes with them and serves those
/// routes from whichever [`DataBackend`] it was built with.
#[derive(Clone)]
pub struct LeadsProxyServer {
    config: Arc<ProxyConfig>,
    tokens: Arc<TokenManager>,
    backend: Arc<dyn DataBackend>,
}

impl LeadsProxyServer {
    /// Create a new server builder.
    pub fn builder() -> LeadsProxyServerBuilder {
        LeadsProxyServerBuilder::default()
    }

    pub fn backend(&self) -> &Arc<dyn DataBackend> {
        &self.backend
    }

    /// Create the axum router with all endpoints, CORS, compression and
    /// request tracing.
    pub fn router(&self) -> Router {
        let protected = Router::new()
            .route("/campaigns", get(handle_list))
            .route("/leads", get(handle_list))
            .route("/leads/{id}", patch(handle_item))
            .route("/customers", any(handle_collection))
            .route("/customers/{id}", any(handle_item))
            .route("/Leads", any(handle_collection))
            .route("/Leads/{id}", any(handle_item))
            .route_layer(middleware::from_fn_with_state(
                self.tokens.clone(),
                require_token,
            ));

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([X_TOTAL_COUNT]);

        Router::new()
            .route("/", get(handle_info))
            .route("/health", get(handle_health))
            .route("/healthz", get(handle_health))
            .route("/oauth/token", post(handle_token))
            .route("/__reset", get(handle_reset))
            .merge(protected)
            .fallback(handle_not_found)
            .method_not_allowed_fallback(handle_not_found)
            .layer(CompressionLayer::new())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }
}

// Handler functions

/// Service description, public
async fn handle_info(State(server): State<LeadsProxyServer>) -> Json<Value> {
    let grant_types: Vec<&str> = GrantType::ALL.iter().map(GrantType::as_str).collect();
    Json(json!({
        "service": "Mock Leads API",
        "backend": server.backend.describe(),
        "oauth": {
            "token_endpoint": "/oauth/token",
            "grant_types": grant_types,
        },
        "routes": [
            "GET /campaigns",
            "GET /leads",
            "PATCH /leads/:id",
            "ANY /customers",
            "ANY /Leads",
            "GET /__reset?key=...",
        ],
    }))
}

async fn handle_health() -> &'static str {
    "ok"
}

/// Handle token issuance.
///
/// Parameters may come as JSON or form body and in the query string; query
/// values win. Basic credentials fill in a missing client id/secret.
async fn handle_token(
    State(server): State<LeadsProxyServer>,
    Query(query): Query<TokenRequest>,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    let body_params: TokenRequest = if body.trim().is_empty() {
        TokenRequest::default()
    } else if headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .contains("application/json")
    {
        serde_json::from_str(&body)
            .map_err(|e| Error::InvalidRequest(format!("invalid JSON: {}", e)))?
    } else {
        serde_urlencoded::from_str(&body)
            .map_err(|e| Error::InvalidRequest(format!("invalid form data: {}", e)))?
    };

    let mut params = query.or(body_params);
    if let Some((client_id, client_secret)) = extract_basic_credentials(&headers) {
        if params.client_id.is_none() {
            params.client_id = Some(client_id);
        }
        if params.client_secret.is_none() {
            params.client_secret = Some(client_secret);
        }
    }

    let response = server.tokens.handle_token_request(params).await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
struct ResetParams {
    key: Option<String>,
}

/// Regenerate the seed and republish it through the backend.
async fn handle_reset(
    State(server): State<LeadsProxyServer>,
    Query(params): Query<ResetParams>,
) -> Result<Response> {
    let authorized = matches!(
        (server.config.reset_key.as_deref(), params.key.as_deref()),
        (Some(expected), Some(given)) if expected == given
    );
    if !authorized {
        tracing::warn!("refused reset with missing or wrong key");
        return Err(Error::Forbidden);
    }

    tracing::info!(backend = %server.backend.describe(), "resetting data from seed");
    let seed = SeedData::build();
    match reset_from_seed(server.backend.as_ref(), &seed).await {
        Ok(counts) => Ok(Json(json!({ "ok": true, "counts": counts })).into_response()),
        Err(e) => {
            tracing::error!(error = %e, "reset failed, backend may be partially populated");
            Err(Error::ResetFailed(e.to_string()))
        }
    }
}

/// List a collection with pass-through query parameters.
async fn handle_list(
    State(server): State<LeadsProxyServer>,
    uri: Uri,
    Query(query): Query<QueryPairs>,
) -> Result<Response> {
    let resource = resource_for(&uri)?;
    list_response(&server, resource, &query).await
}

/// `/customers` and `/Leads`: list or create.
async fn handle_collection(
    State(server): State<LeadsProxyServer>,
    Extension(auth): Extension<Authenticated>,
    method: Method,
    uri: Uri,
    Query(query): Query<QueryPairs>,
    body: Bytes,
) -> Result<Response> {
    let resource = resource_for(&uri)?;
    tracing::info!(%method, %resource, scope = %auth.scope.join(" "), "collection request");

    match method {
        Method::GET => list_response(&server, resource, &query).await,
        Method::POST => {
            let created = server
                .backend
                .create(resource, json_body(&body)?, &query)
                .await?;
            Ok((StatusCode::CREATED, Json(created)).into_response())
        }
        other => Err(Error::MethodNotAllowed(other.to_string())),
    }
}

/// `/customers/{id}`, `/Leads/{id}` and `PATCH /leads/{id}`.
async fn handle_item(
    State(server): State<LeadsProxyServer>,
    method: Method,
    uri: Uri,
    Path(id): Path<String>,
    Query(query): Query<QueryPairs>,
    body: Bytes,
) -> Result<Response> {
    let resource = resource_for(&uri)?;
    tracing::info!(%method, %resource, %id, "item request");

    let record = match method {
        Method::GET => server.backend.get(resource, &id, &query).await?,
        Method::PUT => {
            server
                .backend
                .replace(resource, &id, json_body(&body)?, &query)
                .await?
        }
        Method::PATCH => {
            let Value::Object(fields) = json_body(&body)? else {
                return Err(Error::InvalidRequest(
                    "patch body must be a JSON object".to_string(),
                ));
            };
            server.backend.patch(resource, &id, fields, &query).await?
        }
        Method::DELETE => server.backend.delete(resource, &id, &query).await?,
        other => return Err(Error::MethodNotAllowed(other.to_string())),
    };

    Ok(Json(record).into_response())
}

/// Unmatched routes, and known paths hit with a method they do not serve
async fn handle_not_found(method: Method, uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "method": method.as_str(),
            "path": uri.path(),
        })),
    )
        .into_response()
}

// Helper functions

async fn list_response(
    server: &LeadsProxyServer,
    resource: Resource,
    query: &QueryPairs,
) -> Result<Response> {
    let listing = server.backend.list(resource, query).await?;
    let mut response = Json(listing.body).into_response();
    if let Some(total) = listing.total {
        response
            .headers_mut()
            .insert(X_TOTAL_COUNT, HeaderValue::from(total));
    }
    Ok(response)
}

/// Resolve the first path segment through the [`Resource`] allow-list
fn resource_for(uri: &Uri) -> Result<Resource> {
    let segment = uri
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    Resource::from_segment(segment)
}

/// Parse a request body as JSON; an empty body is an empty object
fn json_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(body)?)
}

// Builder for LeadsProxyServer.
#[derive(Default)]
pub struct LeadsProxyServerBuilder {
    config: Option<ProxyConfig>,
    backend: Option<Arc<dyn DataBackend>>,
    token_store: Option<Arc<dyn TokenStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl LeadsProxyServerBuilder {
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this backend instead of the one described by the config
    pub fn backend(mut self, backend: Arc<dyn DataBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<LeadsProxyServer> {
        let config = self
            .config
            .ok_or_else(|| Error::Config("config required".to_string()))?;

        let backend: Arc<dyn DataBackend> = match self.backend {
            Some(backend) => backend,
            None => match &config.backend {
                BackendKind::Memory => Arc::new(MemoryBackend::seeded()),
                BackendKind::Remote {
                    base_url,
                    api_key,
                    timeout,
                } => Arc::new(RemoteBackend::new(
                    base_url.clone(),
                    api_key.as_deref(),
                    *timeout,
                )?),
            },
        };

        let token_store = self
            .token_store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let tokens = TokenManager::new(token_store, clock, config.token_ttl_seconds)
            .with_client_credentials(config.client_credentials.clone());

        Ok(LeadsProxyServer {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            backend,
        })
    }
}
