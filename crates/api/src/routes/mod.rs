pub mod auth;
pub mod callbacks;
pub mod health;
pub mod images;
pub mod notebooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          login (public)
/// /auth/logout                         logout (requires session)
///
/// /notebooks                           list, submit (GET, POST)
/// /notebooks/{notebook_id}             get notebook (GET)
/// /notebooks/{notebook_id}/cancel      cancel at the agency (POST)
/// /notebooks/{notebook_id}/result      download executed notebook (GET)
///
/// /images                              predefined image catalog (GET)
/// ```
///
/// Connector callbacks and `/health` mount at the application root, not
/// here; see [`callbacks`] and [`health`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes (login, logout).
        .nest("/auth", auth::router())
        // Notebook submission, listing, cancellation, result download.
        .nest("/notebooks", notebooks::router())
        // Predefined image catalog for the submit UI.
        .nest("/images", images::router())
}
