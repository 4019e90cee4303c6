//! Router-level tests for the registry HTTP API.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use license_registry::config::Settings;
use license_registry::RegistryServer;
use serde_json::{json, Value};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn test_router() -> Router {
    RegistryServer::new(Settings::default())
        .expect("server")
        .router()
}

async fn send(router: &Router, request: Request<Body>) -> axum::response::Response {
    router.clone().oneshot(request).await.expect("oneshot failed")
}

async fn get(router: &Router, path: &str) -> axum::response::Response {
    let req = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request");
    send(router, req).await
}

async fn post_json(router: &Router, path: &str, body: Value) -> axum::response::Response {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request");
    send(router, req).await
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("body is not valid JSON")
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

async fn register(router: &Router, device_id: &str, license: &str) {
    let resp = post_json(
        router,
        "/api/devices/register",
        json!({
            "device_id": device_id,
            "license_code": license,
            "public_ip": "10.1.1.1",
            "tcp_port": 7400
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Health and stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_returns_status() {
    let router = test_router();
    let resp = get(&router, "/api/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "license-registry");
    assert!(body["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_health_wrong_method_is_405() {
    let router = test_router();
    let resp = post_json(&router, "/api/health", json!({})).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_text(resp).await, "Method not allowed");
}

#[tokio::test]
async fn test_head_is_405_on_get_routes() {
    let router = test_router();
    register(&router, "dev-a", "L1").await;

    for path in ["/api/health", "/api/stats", "/api/licenses/L1/holder", "/metrics"] {
        let req = Request::builder()
            .method("HEAD")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let resp = send(&router, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "HEAD {path}");
    }
}

#[tokio::test]
async fn test_security_headers_present() {
    let router = test_router();
    let resp = get(&router, "/api/health").await;
    let headers = resp.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
}

#[tokio::test]
async fn test_security_headers_on_errors() {
    let router = test_router();
    let resp = get(&router, "/api/licenses/NOPE/holder").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_stats_reflect_registrations() {
    let router = test_router();
    register(&router, "dev-a", "L1").await;
    register(&router, "dev-b", "L1").await;

    let resp = get(&router, "/api/stats").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats = body_json(resp).await;
    assert_eq!(stats["total_devices"], 2);
    assert_eq!(stats["total_licenses"], 1);
    assert_eq!(stats["registrations"], 2);
}

#[tokio::test]
async fn test_stats_wrong_method_is_405() {
    let router = test_router();
    let resp = post_json(&router, "/api/stats", json!({})).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Registration and heartbeat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_register_returns_device_id() {
    let router = test_router();
    let resp = post_json(
        &router,
        "/api/devices/register",
        json!({"device_id": "dev-a", "license_code": "L1", "tcp_port": 7400}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Device registered successfully");
    assert_eq!(body["device_id"], "dev-a");
}

#[tokio::test]
async fn test_register_rejects_malformed_body() {
    let router = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/api/devices/register")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = send(&router, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(resp).await, "Invalid request body");
}

#[tokio::test]
async fn test_register_rejects_unknown_fields() {
    let router = test_router();
    let resp = post_json(
        &router,
        "/api/devices/register",
        json!({"device_id": "dev-a", "license_code": "L1", "tcp_port": 7400, "role": "admin"}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Nothing was stored
    let stats = body_json(get(&router, "/api/stats").await).await;
    assert_eq!(stats["total_devices"], 0);
}

#[tokio::test]
async fn test_register_rejects_empty_ids() {
    let router = test_router();
    let resp = post_json(
        &router,
        "/api/devices/register",
        json!({"device_id": "", "license_code": "L1", "tcp_port": 7400}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_wrong_method_is_405() {
    let router = test_router();
    let resp = get(&router, "/api/devices/register").await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_heartbeat_known_and_unknown() {
    let router = test_router();
    register(&router, "dev-a", "L1").await;

    let resp = post_json(&router, "/api/devices/heartbeat", json!({"device_id": "dev-a"})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);

    let resp = post_json(&router, "/api/devices/heartbeat", json!({"device_id": "ghost"})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], false);

    let stats = body_json(get(&router, "/api/stats").await).await;
    assert_eq!(stats["total_devices"], 1);
    assert_eq!(stats["heartbeats"], 1);
}

#[tokio::test]
async fn test_heartbeat_bad_body_is_400() {
    let router = test_router();
    let resp = post_json(&router, "/api/devices/heartbeat", json!({"id": 5})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// License holder lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_license_holder_returns_device_with_cache_header() {
    let router = test_router();
    register(&router, "dev-a", "L1").await;

    let resp = get(&router, "/api/licenses/L1/holder").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["cache-control"], "public, max-age=10");

    let device = body_json(resp).await;
    assert_eq!(device["device_id"], "dev-a");
    assert_eq!(device["license_code"], "L1");
    assert_eq!(device["public_ip"], "10.1.1.1");
    assert_eq!(device["tcp_port"], 7400);
    assert!(device["last_seen"].is_string());
}

#[tokio::test]
async fn test_license_holder_last_registration_wins() {
    let router = test_router();
    register(&router, "dev-a", "L1").await;
    register(&router, "dev-b", "L1").await;

    let device = body_json(get(&router, "/api/licenses/L1/holder").await).await;
    assert_eq!(device["device_id"], "dev-b");
}

#[tokio::test]
async fn test_license_holder_unknown_is_404() {
    let router = test_router();
    let resp = get(&router, "/api/licenses/NOPE/holder").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(resp).await, "License not found");
}

#[tokio::test]
async fn test_license_holder_wrong_method_is_405() {
    let router = test_router();
    let resp = post_json(&router, "/api/licenses/L1/holder", json!({})).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Token transfer
// ---------------------------------------------------------------------------

fn transfer_body(from: &str, to: &str, license: &str) -> Value {
    json!({
        "token_id": "tok-0000000000000001",
        "from_device": from,
        "to_device": to,
        "license_code": license
    })
}

#[tokio::test]
async fn test_transfer_success_moves_holder() {
    let router = test_router();
    register(&router, "dev-a", "L1").await;
    register(&router, "dev-b", "L2").await;

    let resp = post_json(
        &router,
        "/api/tokens/transfer",
        transfer_body("dev-a", "dev-b", "L1"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Transfer request recorded");

    let holder = body_json(get(&router, "/api/licenses/L1/holder").await).await;
    assert_eq!(holder["device_id"], "dev-b");
}

#[tokio::test]
async fn test_transfer_from_non_holder_is_500_with_reason() {
    let router = test_router();
    register(&router, "A", "L1").await;
    register(&router, "B", "L1").await;

    let resp = post_json(&router, "/api/tokens/transfer", transfer_body("A", "B", "L1")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(resp).await,
        "device A does not hold license L1 (current holder: B)"
    );
}

#[tokio::test]
async fn test_transfer_to_unregistered_target_keeps_holder() {
    let router = test_router();
    register(&router, "B", "L1").await;

    let resp = post_json(&router, "/api/tokens/transfer", transfer_body("B", "C", "L1")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(resp).await, "target device not registered: C");

    let holder = body_json(get(&router, "/api/licenses/L1/holder").await).await;
    assert_eq!(holder["device_id"], "B");
}

#[tokio::test]
async fn test_transfer_token_data_checked_against_license() {
    let router = test_router();
    register(&router, "A", "L1").await;
    register(&router, "B", "L2").await;

    let mut body = transfer_body("A", "B", "L1");
    body["token_data"] = json!(r#"{"license_code":"L9","signature":"..."}"#);
    let resp = post_json(&router, "/api/tokens/transfer", body).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(resp).await,
        "token validation failed: token license code mismatch"
    );

    let mut body = transfer_body("A", "B", "L1");
    body["token_data"] = json!(r#"{"license_code":"L1","signature":"..."}"#);
    let resp = post_json(&router, "/api/tokens/transfer", body).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_transfer_missing_fields_is_400() {
    let router = test_router();
    let resp = post_json(&router, "/api/tokens/transfer", json!({"token_id": "t"})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transfer_wrong_method_is_405() {
    let router = test_router();
    let resp = get(&router, "/api/tokens/transfer").await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Metrics and unknown routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let router = test_router();
    register(&router, "A", "L1").await;
    let _ = post_json(&router, "/api/tokens/transfer", transfer_body("A", "Z", "L1")).await;

    let resp = get(&router, "/metrics").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;
    assert!(text.contains("license_registry_devices 1"));
    assert!(text.contains(
        r#"license_registry_transfers_total{outcome="target_not_registered"} 1"#
    ));
    assert!(text.contains(r#"route="/api/devices/register""#));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let router = test_router();
    let resp = get(&router, "/api/nonexistent").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Request deadline
// ---------------------------------------------------------------------------

/// A body that never arrives is cut off at the 5 s deadline with 408, and
/// the response still carries the security headers.
#[tokio::test(start_paused = true)]
async fn test_stalled_body_hits_request_deadline() {
    let server = RegistryServer::new(Settings::default()).unwrap();
    let router = server.router();

    let stalled = futures::stream::pending::<Result<Vec<u8>, std::io::Error>>();
    let req = Request::builder()
        .method("POST")
        .uri("/api/devices/register")
        .header("content-type", "application/json")
        .body(Body::from_stream(stalled))
        .unwrap();

    let started = tokio::time::Instant::now();
    let resp = send(&router, req).await;
    assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(resp.headers()["x-frame-options"], "DENY");
    assert!(started.elapsed() >= std::time::Duration::from_secs(5));
    assert_eq!(server.service().stats().total_devices, 0);
}
