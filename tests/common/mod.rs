#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use base64::Engine;
use chrono::Utc;
use payoutd::auth::{BasicAuth, WebhookAuth, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use payoutd::router::build_router;
use payoutd::state::AppState;
use serde_json::Value;

pub const TEST_PASSWORD: &str = "test-password";
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

/// In-memory application with basic auth and webhook signing enabled.
pub async fn test_app() -> Router {
    let state = AppState::new_in_memory().await.unwrap();
    build_router(
        state,
        Arc::new(BasicAuth::new(Some(TEST_PASSWORD.to_string()))),
        Arc::new(WebhookAuth::new(Some(TEST_WEBHOOK_SECRET.to_string()))),
    )
}

/// In-memory application with all authentication disabled.
pub async fn test_app_no_auth() -> Router {
    let state = AppState::new_in_memory().await.unwrap();
    build_router(
        state,
        Arc::new(BasicAuth::new(None)),
        Arc::new(WebhookAuth::new(None)),
    )
}

pub fn auth_header() -> String {
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("payoutd:{}", TEST_PASSWORD))
    )
}

/// Build an authenticated client request with a JSON body.
pub fn client_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth_header());
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Build a webhook delivery signed the way the payment rail signs.
pub fn signed_webhook_request(body: Value) -> Request<Body> {
    let body = body.to_string();
    let timestamp = Utc::now().timestamp();
    let signature = WebhookAuth::new(Some(TEST_WEBHOOK_SECRET.to_string()))
        .create_signature(&body, timestamp)
        .unwrap();

    Request::builder()
        .method("POST")
        .uri("/webhook/status")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header(TIMESTAMP_HEADER, timestamp.to_string())
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
