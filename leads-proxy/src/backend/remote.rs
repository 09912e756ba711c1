use super::{DataBackend, Listing, QueryPairs, Resource, id_string};
use crate::error::{Error, Result};
use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// Page size used when listing a collection to wipe it
pub const WIPE_PAGE_SIZE: usize = 1000;

const TOTAL_COUNT_HEADER: &str = "x-total-count";
const API_KEY_HEADER: &str = "x-api-key";

/// CRUD client for a MockAPI-style remote store.
///
/// Non-2xx answers become [`Error::Upstream`] carrying the remote status and
/// body; transport failures and timeouts become [`Error::Network`]. Nothing
/// is retried.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteBackend {
    pub fn new(base_url: Url, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| Error::Config(format!("invalid API key header: {}", e)))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, resource: Resource, id: Option<&str>) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        match id {
            Some(id) => format!(
                "{}/{}/{}",
                base,
                resource.remote_path(),
                urlencoding::encode(id)
            ),
            None => format!("{}/{}", base, resource.remote_path()),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("remote store request failed: {}", e);
            Error::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.unwrap_or_default();
        tracing::warn!(status = %status, base = %self.base_url, "remote store returned an error");
        Err(Error::Upstream {
            status,
            content_type,
            body,
        })
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = self.send(request).await?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Network(format!("invalid JSON from remote store: {}", e)))
}

#[async_trait]
impl DataBackend for RemoteBackend {
    fn describe(&self) -> String {
        self.base_url.to_string()
    }

    async fn list(&self, resource: Resource, query: &QueryPairs) -> Result<Listing> {
        tracing::debug!(%resource, ?query, "listing remote collection");
        let response = self
            .send(self.client.get(self.url(resource, None)).query(query))
            .await?;

        let total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = read_json(response).await?;

        Ok(Listing { body, total })
    }

    async fn get(&self, resource: Resource, id: &str, query: &QueryPairs) -> Result<Value> {
        self.send_json(self.client.get(self.url(resource, Some(id))).query(query))
            .await
    }

    async fn create(
        &self,
        resource: Resource,
        record: Value,
        query: &QueryPairs,
    ) -> Result<Value> {
        self.send_json(
            self.client
                .post(self.url(resource, None))
                .query(query)
                .json(&record),
        )
        .await
    }

    async fn replace(
        &self,
        resource: Resource,
        id: &str,
        record: Value,
        query: &QueryPairs,
    ) -> Result<Value> {
        self.send_json(
            self.client
                .put(self.url(resource, Some(id)))
                .query(query)
                .json(&record),
        )
        .await
    }

    async fn patch(
        &self,
        resource: Resource,
        id: &str,
        fields: Map<String, Value>,
        query: &QueryPairs,
    ) -> Result<Value> {
        self.send_json(
            self.client
                .patch(self.url(resource, Some(id)))
                .query(query)
                .json(&fields),
        )
        .await
    }

    async fn delete(&self, resource: Resource, id: &str, query: &QueryPairs) -> Result<Value> {
        self.send_json(self.client.delete(self.url(resource, Some(id))).query(query))
            .await
    }

    async fn delete_all(&self, resource: Resource) -> Result<usize> {
        let query: QueryPairs = vec![
            ("page".to_string(), "1".to_string()),
            ("limit".to_string(), WIPE_PAGE_SIZE.to_string()),
        ];
        let listing = match self.list(resource, &query).await {
            Ok(listing) => listing,
            // MockAPI answers 404 for an empty collection
            Err(Error::Upstream { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for item in listing.items() {
            let Some(id) = item.get("id").and_then(id_string) else {
                tracing::warn!(%resource, "skipping record without id");
                continue;
            };
            self.delete(resource, &id, &QueryPairs::new()).await?;
            removed += 1;
        }

        tracing::info!(%resource, removed, "wiped remote collection");
        Ok(removed)
    }
}
