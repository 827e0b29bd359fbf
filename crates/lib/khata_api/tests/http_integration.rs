//! Routing, error rendering and health.

mod common;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use common::{PREFIX, app};
use serde_json::json;

#[tokio::test]
async fn health_reports_version_and_store() {
    let app = app().await;
    let reply = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["store_connected"], true);
    assert_eq!(reply.body["version"], khata_core::version());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = app().await;
    let reply = app.send(Method::GET, "/nope", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn wrong_method_is_json_405() {
    let app = app().await;
    let reply = app.send(Method::GET, "/auth/login", None, None).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn malformed_json_is_400_with_message() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{PREFIX}/auth/login"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = app.send_request(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn missing_fields_are_400() {
    let app = app().await;
    let reply = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "x@example.com"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn routes_live_under_the_prefix() {
    let app = app().await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let reply = app.send_request(request).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
