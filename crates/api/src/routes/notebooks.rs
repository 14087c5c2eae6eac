//! Route definitions for the `/notebooks` resource.
//!
//! All endpoints require authentication.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notebooks;
use crate::state::AppState;

/// Submissions embed whole ipynb documents, so the body cap sits well
/// above axum's 2 MB default.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Routes mounted at `/notebooks`.
///
/// ```text
/// GET    /                          -> list_notebooks
/// POST   /                          -> submit_notebooks
/// GET    /{notebook_id}             -> get_notebook
/// POST   /{notebook_id}/cancel      -> cancel_notebook
/// GET    /{notebook_id}/result      -> download_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(notebooks::list_notebooks).post(notebooks::submit_notebooks),
        )
        .route("/{notebook_id}", get(notebooks::get_notebook))
        .route("/{notebook_id}/cancel", post(notebooks::cancel_notebook))
        .route("/{notebook_id}/result", get(notebooks::download_result))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
