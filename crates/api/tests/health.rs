//! Integration tests for the health check endpoint and general HTTP
//! behaviour.
//!
//! These tests run without a live Postgres. The pool connects lazily to an
//! unroutable address, so the health endpoint answers but reports the
//! database as unhealthy.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 and reports component health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_reports_degraded_without_database() {
    let app = common::build_test_app(common::test_pool());
    let response = get(app, "/health").await;

    // Health always answers 200; component state lives in the body.
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;

    assert_eq!(json["status"], "degraded");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], false);
    // The store root is the temp directory, which exists.
    assert_eq!(json["store_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: unmatched paths fall through to 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app(common::test_pool());
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: every response carries an x-request-id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app(common::test_pool());
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(request_id.is_some(), "x-request-id header missing");

    // UUIDs render as 36 chars with hyphens.
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight for the submit route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_returns_correct_headers() {
    let app = common::build_test_app(common::test_pool());

    // Preflight needs the full header set, so no helper here.
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/notebooks")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();

    // The allowed origin echoes the request origin.
    let allow_origin = headers
        .get("access-control-allow-origin")
        .expect("Missing Access-Control-Allow-Origin header")
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "http://localhost:5173");

    // Access-Control-Allow-Methods must include POST.
    let allow_methods = headers
        .get("access-control-allow-methods")
        .expect("Missing Access-Control-Allow-Methods header")
        .to_str()
        .unwrap();
    assert!(
        allow_methods.contains("POST"),
        "Allow-Methods should contain POST, got: {allow_methods}"
    );

    // Credentialed requests (session cookie) must be allowed.
    let allow_credentials = headers
        .get("access-control-allow-credentials")
        .expect("Missing Access-Control-Allow-Credentials header")
        .to_str()
        .unwrap();
    assert_eq!(allow_credentials, "true");
}
