//! Handlers for agency connector callbacks.
//!
//! These endpoints are called by the RED connectors running inside the
//! agency's execution environment, not by browsers. They authenticate
//! with HTTP basic auth: the owner's agency username as the user and the
//! per-job notebook token as the password.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use base64::prelude::{Engine as _, BASE64_STANDARD};

use nbrelay_core::error::CoreError;
use nbrelay_core::types::NotebookId;
use nbrelay_db::models::notebook::Notebook;

use crate::error::{AppError, AppResult};
use crate::registry;
use crate::state::AppState;
use crate::store::{notebook_key, result_key};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an HTTP basic auth header into `(username, password)`.
///
/// Returns `None` on a missing header, a non-Basic scheme, bad base64,
/// or a payload without a `:` separator.
fn parse_basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64_STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Authenticate a connector request against a notebook's token.
///
/// Header parsing happens before any database access; a request without
/// usable credentials is rejected immediately.
async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    notebook_id: NotebookId,
) -> AppResult<Notebook> {
    let (username, token) = parse_basic_auth(headers).ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Basic authentication required".into(),
        ))
    })?;

    registry::authorize_callback(state, notebook_id, &username, &token).await
}

// ---------------------------------------------------------------------------
// Notebook download (input connector)
// ---------------------------------------------------------------------------

/// GET /notebook/{notebook_id}
///
/// Serve the uploaded notebook to the agency's input connector.
pub async fn get_notebook(
    State(state): State<AppState>,
    Path(notebook_id): Path<NotebookId>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    authorize(&state, &headers, notebook_id).await?;

    let bytes = state.store.load(&notebook_key(notebook_id)).await?;

    tracing::debug!(%notebook_id, bytes = bytes.len(), "Notebook fetched by connector");

    Ok(([(header::CONTENT_TYPE, "application/json")], bytes))
}

// ---------------------------------------------------------------------------
// Result upload (output connector)
// ---------------------------------------------------------------------------

/// POST /result/{notebook_id}
///
/// Accept the executed notebook from the agency's output connector.
/// Returns 204; a repeated upload overwrites the previous artifact.
pub async fn post_result(
    State(state): State<AppState>,
    Path(notebook_id): Path<NotebookId>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> AppResult<impl IntoResponse> {
    authorize(&state, &headers, notebook_id).await?;

    state.store.save(&result_key(notebook_id), &body).await?;

    tracing::info!(%notebook_id, bytes = body.len(), "Result uploaded");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Python requirements (install step)
// ---------------------------------------------------------------------------

/// GET /python_requirements/{notebook_id}
///
/// Serve the job's `requirements.txt` contents. 404 when the job was
/// submitted without python requirements.
pub async fn get_python_requirements(
    State(state): State<AppState>,
    Path(notebook_id): Path<NotebookId>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let notebook = authorize(&state, &headers, notebook_id).await?;

    let requirements = notebook.python_requirements.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Python requirements",
            id: notebook_id.to_string(),
        })
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        requirements,
    ))
}
