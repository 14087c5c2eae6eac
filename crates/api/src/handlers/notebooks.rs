//! Handlers for the `/notebooks` resource.
//!
//! All endpoints require authentication via [`AuthUser`]; users only ever
//! see their own notebooks.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use nbrelay_core::error::CoreError;
use nbrelay_core::images::ImageChoice;
use nbrelay_core::red::{ExternalDataBinding, GpuRequirement};
use nbrelay_core::types::NotebookId;
use nbrelay_db::models::notebook::{Notebook, NotebookResponse};
use nbrelay_db::models::status::NotebookStatus;
use nbrelay_db::repositories::NotebookRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::registry::{self, SubmitParams};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::store::result_key;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// One notebook within a submission request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NotebookSubmission {
    /// The ipynb document itself.
    pub data: serde_json::Value,
    #[validate(length(min = 1, message = "filename must not be empty"))]
    pub filename: String,
}

/// Request body for `POST /notebooks`.
///
/// Image choice, GPU requirements, external data, and python requirements
/// are shared by every notebook in the batch.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitNotebooksRequest {
    #[validate(
        length(min = 1, message = "jupyter_notebooks must not be empty"),
        nested
    )]
    pub jupyter_notebooks: Vec<NotebookSubmission>,
    /// Contents of a `requirements.txt` to install before execution.
    pub python_requirements: Option<String>,
    /// Container image selection; omitted means the default image.
    pub docker_image: Option<ImageChoice>,
    #[serde(default)]
    pub gpu_requirements: Vec<GpuRequirement>,
    #[serde(default)]
    pub external_data: Vec<ExternalDataBinding>,
}

/// Response body for `POST /notebooks/{notebook_id}/cancel`.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Agency batch that was cancelled.
    pub batch_id: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a notebook by its public ID and verify the caller owns it.
///
/// Returns `NotFound` if the notebook does not exist, `Forbidden` if the
/// caller is not the owner. `action` is used in the error message
/// (e.g. "view", "download").
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    notebook_id: NotebookId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<Notebook> {
    let notebook = NotebookRepo::find_by_notebook_id(pool, notebook_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notebook",
            id: notebook_id.to_string(),
        }))?;

    if notebook.user_id != auth.user.id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's notebook"
        ))));
    }

    Ok(notebook)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/notebooks
///
/// Submit one or more notebooks for execution. Returns 201 with the
/// created jobs. Notebooks are submitted in order and the first failure
/// aborts the request; jobs submitted before the failure remain.
pub async fn submit_notebooks(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitNotebooksRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    // An empty requirements file is the same as none at all.
    let python_requirements = input
        .python_requirements
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let mut created = Vec::with_capacity(input.jupyter_notebooks.len());
    for submission in &input.jupyter_notebooks {
        let notebook = registry::submit_notebook(
            &state,
            &auth.user,
            &SubmitParams {
                notebook_data: &submission.data,
                filename: &submission.filename,
                python_requirements,
                image: input.docker_image.as_ref(),
                gpus: &input.gpu_requirements,
                external_data: &input.external_data,
            },
        )
        .await?;
        created.push(NotebookResponse::from(&notebook));
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/notebooks
///
/// Reconcile the caller's running jobs against the agency, then list all
/// of the caller's notebooks newest-first.
pub async fn list_notebooks(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    registry::reconcile_user_jobs(&state, &auth.user).await?;

    let notebooks = NotebookRepo::list_by_user(&state.pool, auth.user.id).await?;
    let data: Vec<NotebookResponse> = notebooks.iter().map(NotebookResponse::from).collect();

    Ok(Json(DataResponse { data }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/notebooks/{notebook_id}
///
/// Get a single notebook by its public ID. Owner only.
pub async fn get_notebook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notebook_id): Path<NotebookId>,
) -> AppResult<impl IntoResponse> {
    let notebook = find_and_authorize(&state.pool, notebook_id, &auth, "view").await?;
    Ok(Json(DataResponse {
        data: NotebookResponse::from(&notebook),
    }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/notebooks/{notebook_id}/cancel
///
/// Ask the agency to cancel a running notebook. Owner only. The local
/// status stays `processing` until reconciliation observes the cancelled
/// batch.
pub async fn cancel_notebook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notebook_id): Path<NotebookId>,
) -> AppResult<impl IntoResponse> {
    let batch_id = registry::cancel_notebook(&state, &auth.user, notebook_id).await?;
    Ok(Json(DataResponse {
        data: CancelResponse { batch_id },
    }))
}

// ---------------------------------------------------------------------------
// Result download
// ---------------------------------------------------------------------------

/// GET /api/v1/notebooks/{notebook_id}/result
///
/// Download the executed notebook. Owner only; available once the job
/// reached `success`. Served as an attachment named after the original
/// upload.
pub async fn download_result(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notebook_id): Path<NotebookId>,
) -> AppResult<impl IntoResponse> {
    let notebook = find_and_authorize(&state.pool, notebook_id, &auth, "download").await?;

    if NotebookStatus::from_id(notebook.status) != Some(NotebookStatus::Success) {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notebook result",
            id: notebook_id.to_string(),
        }));
    }

    let bytes = state.store.load(&result_key(notebook_id)).await?;

    let filename = sanitize_filename(&notebook.notebook_filename);
    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];

    Ok((headers, bytes))
}

/// Strip characters that would break the `Content-Disposition` header.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\r' | '\n' => '_',
            c => c,
        })
        .collect()
}
