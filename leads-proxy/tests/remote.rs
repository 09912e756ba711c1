//! Remote backend tests against an `httpmock` stand-in for the MockAPI store.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use httpmock::Method::PATCH;
use httpmock::prelude::*;
use leads_proxy::{DataBackend, Error, LeadsProxyServer, ProxyConfig, RemoteBackend, Resource};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;
use url::Url;

fn remote(base: &str, api_key: Option<&str>) -> RemoteBackend {
    RemoteBackend::new(Url::parse(base).unwrap(), api_key, Duration::from_secs(5)).unwrap()
}

fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn list_forwards_query_and_total_count() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/Leads")
                .query_param("campaignId", "CAMP002")
                .query_param("page", "1")
                .query_param("limit", "2");
            then.status(200)
                .header("x-total-count", "5")
                .json_body(json!([{ "id": "6" }, { "id": "7" }]));
        })
        .await;

    let backend = remote(&server.url("/api/v1"), None);
    let listing = backend
        .list(
            Resource::Leads,
            &pairs(&[("campaignId", "CAMP002"), ("page", "1"), ("limit", "2")]),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(listing.total, Some(5));
    assert_eq!(listing.items().len(), 2);
}

#[tokio::test]
async fn api_key_is_sent_on_every_call() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/customers/3")
                .header("x-api-key", "k-123");
            then.status(200).json_body(json!({ "id": "3", "name": "BlueSky Retail" }));
        })
        .await;

    let backend = remote(&server.base_url(), Some("k-123"));
    let customer = backend
        .get(Resource::Customers, "3", &vec![])
        .await.unwrap();

    mock.assert_async().await;
    assert_eq!(customer["name"], "BlueSky Retail");
}

#[tokio::test]
async fn non_success_status_becomes_upstream_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/Leads/99");
            then.status(404)
                .header("content-type", "text/plain")
                .body("\"Not found\"");
        })
        .await;

    let backend = remote(&server.base_url(), None);
    let err = backend
        .patch(Resource::Leads, "99", serde_json::Map::new(), &vec![])
        .await
        .unwrap_err();

    match err {
        Error::Upstream { status, body, .. } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(&body[..], b"\"Not found\"");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_store_is_a_network_error() {
    // nothing listens on the discard port
    let backend = remote("http://127.0.0.1:9", None);
    let err = backend.list(Resource::Customers, &vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "{:?}", err);
    assert_eq!(err.code(), "proxy_error");
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn delete_all_removes_each_listed_record() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/customers")
                .query_param("page", "1")
                .query_param("limit", "1000");
            then.status(200)
                .json_body(json!([{ "id": "1" }, { "id": 2 }, { "name": "no id" }]));
        })
        .await;
    let first = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/customers/1");
            then.status(200).json_body(json!({ "id": "1" }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/customers/2");
            then.status(200).json_body(json!({ "id": "2" }));
        })
        .await;

    let backend = remote(&server.base_url(), None);
    let removed = backend.delete_all(Resource::Customers).await.unwrap();

    assert_eq!(removed, 2);
    list.assert_async().await;
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn delete_all_treats_missing_collection_as_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Leads");
            then.status(404).body("\"Not found\"");
        })
        .await;

    let backend = remote(&server.base_url(), None);
    assert_eq!(backend.delete_all(Resource::Leads).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_all_stops_at_first_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Leads");
            then.status(200).json_body(json!([{ "id": "1" }, { "id": "2" }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/Leads/1");
            then.status(500).json_body(json!({ "msg": "boom" }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/Leads/2");
            then.status(200).json_body(json!({ "id": "2" }));
        })
        .await;

    let backend = remote(&server.base_url(), None);
    let err = backend.delete_all(Resource::Leads).await.unwrap_err();

    assert!(
        matches!(err, Error::Upstream { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR)
    );
    assert_eq!(second.hits_async().await, 0);
}

// ── Through the router ────────────────────────────────────────────────────────

async fn routed(server: &MockServer, request: Request<Body>) -> (StatusCode, Value) {
    let config = ProxyConfig::remote(Url::parse(&server.base_url()).unwrap())
        .with_reset_key("letmein");
    let app = LeadsProxyServer::builder()
        .config(config)
        .build()
        .unwrap()
        .router();

    let token_request = Request::builder()
        .method("POST")
        .uri("/oauth/token?grant_type=client_credentials")
        .body(Body::empty())
        .unwrap();
    let token_response = app.clone().oneshot(token_request).await.unwrap();
    let token_body = token_response.into_body().collect().await.unwrap().to_bytes();
    let token: Value = serde_json::from_slice(&token_body).unwrap();

    let (mut parts, body) = request.into_parts();
    parts.headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token["access_token"].as_str().unwrap())
            .parse()
            .unwrap(),
    );
    let response = app
        .oneshot(Request::from_parts(parts, body))
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn upstream_status_and_body_are_relayed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/customers/77");
            then.status(404).json_body(json!("Not found"));
        })
        .await;

    let request = Request::builder()
        .uri("/customers/77")
        .body(Body::empty())
        .unwrap();
    let (status, body) = routed(&server, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!("Not found"));
}

#[tokio::test]
async fn lowercase_leads_route_patches_remote_leads() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/Leads/5")
                .json_body(json!({ "status": "qualified" }));
            then.status(200)
                .json_body(json!({ "id": "5", "status": "qualified" }));
        })
        .await;

    let request = Request::builder()
        .method("PATCH")
        .uri("/leads/5")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "status": "qualified" }).to_string()))
        .unwrap();
    let (status, body) = routed(&server, request).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "qualified");
}

#[tokio::test]
async fn item_routes_forward_the_query_string() {
    let server = MockServer::start_async().await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/customers/4")
                .query_param("fields", "name");
            then.status(200).json_body(json!({ "id": "4", "name": "Copper Canyon Health" }));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/Leads/8")
                .query_param("soft", "true");
            then.status(200).json_body(json!({ "id": "8" }));
        })
        .await;

    let request = Request::builder()
        .uri("/customers/4?fields=name")
        .body(Body::empty())
        .unwrap();
    let (status, body) = routed(&server, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Copper Canyon Health");

    let request = Request::builder()
        .method("DELETE")
        .uri("/Leads/8?soft=true")
        .body(Body::empty())
        .unwrap();
    let (status, _) = routed(&server, request).await;
    assert_eq!(status, StatusCode::OK);

    get.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn reset_republishes_seed_to_remote() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/customers");
            then.status(200).json_body(json!([{ "id": "1" }]));
        })
        .await;
    let wipe = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/customers/1");
            then.status(200).json_body(json!({ "id": "1" }));
        })
        .await;
    let customers = server
        .mock_async(|when, then| {
            when.method(POST).path("/customers");
            then.status(201).json_body(json!({ "id": "1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/Leads");
            then.status(404).body("\"Not found\"");
        })
        .await;
    let leads = server
        .mock_async(|when, then| {
            when.method(POST).path("/Leads");
            then.status(201).json_body(json!({ "id": "1" }));
        })
        .await;

    let request = Request::builder()
        .uri("/__reset?key=letmein")
        .body(Body::empty())
        .unwrap();
    let (status, body) = routed(&server, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "ok": true, "counts": { "customers": 10, "Leads": 95 } })
    );
    wipe.assert_async().await;
    customers.assert_hits_async(10).await;
    leads.assert_hits_async(95).await;
}

#[tokio::test]
async fn failed_publish_is_reported_as_reset_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/customers");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/customers");
            then.status(500).body("quota exceeded");
        })
        .await;

    let request = Request::builder()
        .uri("/__reset?key=letmein")
        .body(Body::empty())
        .unwrap();
    let (status, body) = routed(&server, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "reset_failed");
}
