//! Integration tests for login validation and session-cookie enforcement.
//!
//! Everything here exercises paths that reject a request before touching
//! the database or the agency, so no external services are needed.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: login with a malformed body is rejected by the JSON extractor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_rejects_malformed_body() {
    let app = common::build_test_app(common::test_pool());
    let response = post_json(app, "/api/v1/auth/login", json!({})).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// Test: login with empty fields fails validation before any network I/O
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_rejects_empty_fields() {
    let app = common::build_test_app(common::test_pool());
    let response = post_json(
        app,
        "/api/v1/auth/login",
        json!({
            "agency_url": "",
            "agency_username": "",
            "agency_password": ""
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: protected endpoints reject requests without a session cookie
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notebook_list_requires_session_cookie() {
    let app = common::build_test_app(common::test_pool());
    let response = get(app, "/api/v1/notebooks").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn notebook_submit_requires_session_cookie() {
    let app = common::build_test_app(common::test_pool());

    // The auth extractor runs before the body is even parsed.
    let response = post_json(
        app,
        "/api/v1/notebooks",
        json!({ "jupyter_notebooks": [] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn notebook_subroutes_require_session_cookie() {
    let notebook_id = uuid::Uuid::new_v4();

    for uri in [
        format!("/api/v1/notebooks/{notebook_id}"),
        format!("/api/v1/notebooks/{notebook_id}/result"),
    ] {
        let app = common::build_test_app(common::test_pool());
        let response = get(app, &uri).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "expected 401 for {uri}"
        );
    }

    let app = common::build_test_app(common::test_pool());
    let response = post_json(
        app,
        &format!("/api/v1/notebooks/{notebook_id}/cancel"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn image_catalog_requires_session_cookie() {
    let app = common::build_test_app(common::test_pool());
    let response = get(app, "/api/v1/images").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_requires_session_cookie() {
    let app = common::build_test_app(common::test_pool());
    let response = post_json(app, "/api/v1/auth/logout", json!({})).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
