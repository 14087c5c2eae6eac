//! Route definitions for the `/images` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// GET /  -> list_images
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(images::list_images))
}
