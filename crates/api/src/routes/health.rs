use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `"ok"` when every dependency probe passes, `"degraded"` otherwise.
    pub status: &'static str,
    /// Crate version baked in at compile time.
    pub version: &'static str,
    /// Whether the database answers a probe query.
    pub db_healthy: bool,
    /// Whether the notebook blob directory is accessible.
    pub store_healthy: bool,
}

/// GET /health -- returns service, database, and blob store health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = nbrelay_db::health_check(&state.pool).await.is_ok();
    let store_healthy = tokio::fs::metadata(&state.config.notebook_dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    let status = if db_healthy && store_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        store_healthy,
    })
}

/// Mount the health route. Lives at root level, NOT under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
