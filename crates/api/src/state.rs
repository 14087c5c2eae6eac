use std::sync::Arc;

use crate::config::ServerConfig;
use crate::store::NotebookStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: nbrelay_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shared HTTP client for agency calls (connection pooling across users).
    pub http: reqwest::Client,
    /// Blob store for uploaded notebooks and their results.
    pub store: Arc<dyn NotebookStore>,
}
