//! Route definitions for the agency connector callbacks.
//!
//! Mounted at the application root, NOT under `/api/v1`: these paths are
//! baked into RED documents as absolute URLs and authenticate per job via
//! basic auth rather than web sessions.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::callbacks;
use crate::state::AppState;

/// Executed notebooks embed their output cells and can be large, so the
/// upload cap sits well above axum's 2 MB default.
const MAX_RESULT_BYTES: usize = 50 * 1024 * 1024;

/// Routes mounted at the application root.
///
/// ```text
/// GET  /notebook/{notebook_id}             -> get_notebook
/// POST /result/{notebook_id}               -> post_result
/// GET  /python_requirements/{notebook_id}  -> get_python_requirements
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notebook/{notebook_id}", get(callbacks::get_notebook))
        .route(
            "/result/{notebook_id}",
            post(callbacks::post_result).layer(DefaultBodyLimit::max(MAX_RESULT_BYTES)),
        )
        .route(
            "/python_requirements/{notebook_id}",
            get(callbacks::get_python_requirements),
        )
}
