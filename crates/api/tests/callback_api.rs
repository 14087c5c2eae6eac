//! Integration tests for connector callback authentication.
//!
//! Callback credentials are parsed from the `Authorization` header before
//! any database access, so malformed credentials are rejected without a
//! live Postgres.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use tower::ServiceExt;
use uuid::Uuid;

/// Send a GET request with an optional `Authorization` header value.
async fn get_with_auth(uri: &str, auth_header: Option<&str>) -> StatusCode {
    let app = common::build_test_app(common::test_pool());

    let mut builder = Request::builder().uri(uri);
    if let Some(value) = auth_header {
        builder = builder.header(header::AUTHORIZATION, value);
    }

    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    response.status()
}

// ---------------------------------------------------------------------------
// Test: callbacks without credentials are rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn callbacks_reject_missing_authorization() {
    let notebook_id = Uuid::new_v4();

    for uri in [
        format!("/notebook/{notebook_id}"),
        format!("/python_requirements/{notebook_id}"),
    ] {
        let status = get_with_auth(&uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "expected 401 for {uri}");
    }
}

#[tokio::test]
async fn result_upload_rejects_missing_authorization() {
    let app = common::build_test_app(common::test_pool());
    let notebook_id = Uuid::new_v4();

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/result/{notebook_id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Test: malformed Authorization headers are rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn callbacks_reject_non_basic_scheme() {
    let uri = format!("/notebook/{}", Uuid::new_v4());
    let status = get_with_auth(&uri, Some("Bearer some-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callbacks_reject_invalid_base64() {
    let uri = format!("/notebook/{}", Uuid::new_v4());
    let status = get_with_auth(&uri, Some("Basic !!!not-base64!!!")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callbacks_reject_credentials_without_separator() {
    // Valid base64, but no `username:password` separator inside.
    let encoded = BASE64_STANDARD.encode("no-colon-here");
    let uri = format!("/notebook/{}", Uuid::new_v4());
    let status = get_with_auth(&uri, Some(&format!("Basic {encoded}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
