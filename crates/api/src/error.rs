use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use nbrelay_agency::api::AgencyApiError;
use nbrelay_core::error::CoreError;

use crate::store::StoreError;

/// Error type returned by every HTTP handler.
///
/// Wraps the domain, agency, database, and store error types and renders
/// all of them as the same JSON error body via [`IntoResponse`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `nbrelay_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure talking to the execution backend.
    #[error(transparent)]
    Agency(#[from] AgencyApiError),

    /// A sqlx error from the data layer.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A notebook blob store error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// A rejected request with an explanation for the client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An unexpected failure; details are logged, never returned.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result alias used by handlers and the registry.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- Domain errors ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Configuration(msg) => (
                    StatusCode::BAD_REQUEST,
                    "CONFIGURATION_ERROR",
                    msg.clone(),
                ),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Execution backend errors ---
            AppError::Agency(agency) => classify_agency_error(agency),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Blob store errors ---
            AppError::Store(store) => match store {
                StoreError::NotFound { key } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("No stored notebook for {key}"),
                ),
                StoreError::Io { .. } => {
                    tracing::error!(error = %store, "Blob store error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORAGE_ERROR",
                        "A storage error occurred".to_string(),
                    )
                }
            },

            // --- Handler-level errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an agency error into an HTTP status, error code, and message.
///
/// Communication failures surface as 502 so clients can tell a broken
/// backend from a broken request; invariant violations and missing debug
/// info keep request-level statuses.
fn classify_agency_error(err: &AgencyApiError) -> (StatusCode, &'static str, String) {
    match err {
        AgencyApiError::Request(_)
        | AgencyApiError::ApiError { .. }
        | AgencyApiError::MissingAuthCookie => {
            tracing::error!(error = %err, "Agency communication error");
            (StatusCode::BAD_GATEWAY, "AGENCY_ERROR", err.to_string())
        }
        AgencyApiError::BatchResolution { .. } => {
            (StatusCode::BAD_REQUEST, "BATCH_RESOLUTION", err.to_string())
        }
        AgencyApiError::DebugInfoUnavailable { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
    }
}

/// Map a sqlx error onto status, code, and client message.
///
/// `RowNotFound` becomes 404 and violations of our `uq_` unique
/// constraints become 409; everything else is a sanitized 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // 23505 is Postgres unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value for constraint {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
