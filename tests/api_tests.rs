#![allow(clippy::unwrap_used)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use common::{
    body_json, client_request, signed_webhook_request, test_app, test_app_no_auth,
};
use payoutd::auth::{WebhookAuth, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn add_method(app: &Router, doctor_id: &str, number: &str, is_default: bool) -> Value {
    let response = app
        .clone()
        .oneshot(client_request(
            "POST",
            "/methods",
            Some(json!({
                "doctorId": doctor_id,
                "provider": "MTN",
                "number": number,
                "isDefault": is_default,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn create_request(app: &Router, doctor_id: &str, amount: u64, method_id: &str) -> Value {
    let response = app
        .clone()
        .oneshot(client_request(
            "POST",
            "/requests",
            Some(json!({
                "doctorId": doctor_id,
                "amount": amount,
                "methodId": method_id,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_client_routes_require_auth() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/methods/doc_123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(client_request("GET", "/methods/doc_123", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_routes_skip_auth() {
    let app = test_app().await;

    for uri in ["/health", "/health/live", "/health/ready"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "unexpected status for {uri}");
    }
}

#[tokio::test]
async fn test_method_crud_flow() {
    let app = test_app().await;

    let first = add_method(&app, "doc_123", "0241234567", true).await;
    assert_eq!(first["provider"], "MTN");
    assert_eq!(first["isDefault"], true);
    assert_eq!(first["type"], "mobile_money");

    let second = add_method(&app, "doc_123", "0551112222", false).await;
    let second_id = second["id"].as_str().unwrap();

    // flip the default to the second method
    let response = app
        .clone()
        .oneshot(client_request(
            "PATCH",
            &format!("/methods/{}/default", second_id),
            Some(json!({"doctorId": "doc_123"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["isDefault"], true);

    let response = app
        .clone()
        .oneshot(client_request("GET", "/methods/doc_123", None))
        .await
        .unwrap();
    let methods = body_json(response).await;
    let defaults: Vec<_> = methods
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["isDefault"] == true)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["id"], second["id"]);

    let response = app
        .clone()
        .oneshot(client_request(
            "DELETE",
            &format!("/methods/{}", second_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(client_request(
            "DELETE",
            &format!("/methods/{}", second_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_method_rejects_bad_number() {
    let app = test_app().await;

    let response = app
        .oneshot(client_request(
            "POST",
            "/methods",
            Some(json!({
                "doctorId": "doc_123",
                "provider": "MTN",
                "number": "0201234567",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_request_lifecycle_flow() {
    let app = test_app().await;

    let method = add_method(&app, "doc_123", "0241234567", true).await;
    let method_id = method["id"].as_str().unwrap();

    let request = create_request(&app, "doc_123", 2_500, method_id).await;
    assert_eq!(request["status"], "pending");
    assert_eq!(request["currency"], "GHS");
    assert!(request["reference"].as_str().unwrap().starts_with("PAY-"));
    let request_id = request["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(client_request("GET", "/requests/doc_123", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(client_request(
            "PATCH",
            &format!("/requests/{}/cancel", request_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "cancelled");

    // cancelled is terminal
    let response = app
        .oneshot(client_request(
            "PATCH",
            &format!("/requests/{}/cancel", request_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_simulate_and_retry_flow() {
    let app = test_app().await;

    let method = add_method(&app, "doc_123", "0241234567", true).await;
    let request = create_request(&app, "doc_123", 900, method["id"].as_str().unwrap()).await;
    let request_id = request["id"].as_str().unwrap();

    for (status, expected) in [("processing", "processing"), ("failed", "failed")] {
        let response = app
            .clone()
            .oneshot(client_request(
                "POST",
                "/simulate/process",
                Some(json!({
                    "requestId": request_id,
                    "newStatus": status,
                    "failureReason": "wallet unreachable",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], expected);
    }

    let response = app
        .clone()
        .oneshot(client_request(
            "PATCH",
            &format!("/requests/{}/retry", request_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let retried = body_json(response).await;
    assert_eq!(retried["status"], "pending");
    assert!(retried.get("failureReason").is_none());

    // retry only applies to failed requests
    let response = app
        .oneshot(client_request(
            "PATCH",
            &format!("/requests/{}/retry", request_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_signature_enforced() {
    let app = test_app().await;

    let method = add_method(&app, "doc_123", "0241234567", true).await;
    let request = create_request(&app, "doc_123", 500, method["id"].as_str().unwrap()).await;
    let request_id = request["id"].as_str().unwrap().to_string();

    // unsigned delivery is refused
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/status")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"requestId": request_id, "status": "processing"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // delivery signed with the wrong secret is refused
    let body = json!({"requestId": request_id, "status": "processing"}).to_string();
    let timestamp = Utc::now().timestamp();
    let bad_signature = WebhookAuth::new(Some("wrong-secret".to_string()))
        .create_signature(&body, timestamp)
        .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/status")
                .header(header::CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, bad_signature)
                .header(TIMESTAMP_HEADER, timestamp.to_string())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // a properly signed delivery goes through
    let response = app
        .oneshot(signed_webhook_request(
            json!({"requestId": request_id, "status": "processing"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "processing");
}

#[tokio::test]
async fn test_webhook_conflict_and_idempotence() {
    let app = test_app().await;

    let method = add_method(&app, "doc_123", "0241234567", true).await;
    let request = create_request(&app, "doc_123", 1_500, method["id"].as_str().unwrap()).await;
    let request_id = request["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        // duplicate deliveries are 200 no-ops
        let response = app
            .clone()
            .oneshot(signed_webhook_request(
                json!({"requestId": request_id, "status": "processing"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(signed_webhook_request(
            json!({"requestId": request_id, "status": "completed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // completed is terminal; a late "failed" report conflicts
    let response = app
        .clone()
        .oneshot(signed_webhook_request(
            json!({"requestId": request_id, "status": "failed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "CONFLICT");

    // unknown requests are 404
    let response = app
        .oneshot(signed_webhook_request(
            json!({"requestId": "no-such-request", "status": "processing"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_reflect_request_history() {
    let app = test_app_no_auth().await;

    let method = add_method(&app, "doc_123", "0241234567", true).await;
    let method_id = method["id"].as_str().unwrap();

    let pending = create_request(&app, "doc_123", 800, method_id).await;
    let completed = create_request(&app, "doc_123", 1_500, method_id).await;
    let failed = create_request(&app, "doc_123", 1_200, method_id).await;
    let _ = pending;

    for (request, path) in [
        (&completed, vec!["processing", "completed"]),
        (&failed, vec!["processing", "failed"]),
    ] {
        for status in path {
            let response = app
                .clone()
                .oneshot(client_request(
                    "POST",
                    "/simulate/process",
                    Some(json!({
                        "requestId": request["id"],
                        "newStatus": status,
                    })),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    let response = app
        .clone()
        .oneshot(client_request("GET", "/stats/doc_123", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["totalRequested"], 3);
    assert_eq!(stats["totalCompleted"], 1);
    assert_eq!(stats["totalFailed"], 1);
    assert_eq!(stats["pendingAmount"], 800);
    assert_eq!(stats["completedAmount"], 1500);

    // unknown doctors get all-zero stats, not an error
    let response = app
        .oneshot(client_request("GET", "/stats/doc_nobody", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["totalRequested"], 0);
}

#[tokio::test]
async fn test_create_request_error_paths() {
    let app = test_app_no_auth().await;

    let method = add_method(&app, "doc_123", "0241234567", true).await;
    let method_id = method["id"].as_str().unwrap();

    // zero amount
    let response = app
        .clone()
        .oneshot(client_request(
            "POST",
            "/requests",
            Some(json!({"doctorId": "doc_123", "amount": 0, "methodId": method_id})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // another doctor's method
    let response = app
        .oneshot(client_request(
            "POST",
            "/requests",
            Some(json!({"doctorId": "doc_456", "amount": 100, "methodId": method_id})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
