//! Notebook job registry: submission, reconciliation, cancellation, and
//! callback authorization.
//!
//! This module owns the workflow that spans the blob store, the database,
//! and the CC-Agency API. Handlers stay thin; every multi-step operation
//! with cleanup or ordering requirements lives here.

use chrono::Utc;
use uuid::Uuid;

use nbrelay_agency::api::AgencyApi;
use nbrelay_agency::batch::{single_batch, BatchFilter, BatchState};
use nbrelay_core::error::CoreError;
use nbrelay_core::images::{resolve_image, ImageChoice};
use nbrelay_core::red::{build_red_document, ExternalDataBinding, GpuRequirement, RedParams};
use nbrelay_core::types::NotebookId;
use nbrelay_db::models::notebook::{CreateNotebook, Notebook};
use nbrelay_db::models::status::NotebookStatus;
use nbrelay_db::models::user::User;
use nbrelay_db::repositories::{CookieRepo, NotebookRepo, UserRepo};

use crate::auth::token::{generate_notebook_token, hash_notebook_token, verify_notebook_token};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::notebook_key;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Everything a single notebook submission needs beyond the caller identity.
#[derive(Debug)]
pub struct SubmitParams<'a> {
    /// Raw notebook document (ipynb JSON) as uploaded.
    pub notebook_data: &'a serde_json::Value,
    /// Original upload filename, echoed on result download.
    pub filename: &'a str,
    /// Contents of an optional `requirements.txt`.
    pub python_requirements: Option<&'a str>,
    /// Container image selection; `None` falls back to the default image.
    pub image: Option<&'a ImageChoice>,
    pub gpus: &'a [GpuRequirement],
    pub external_data: &'a [ExternalDataBinding],
}

/// Submit one notebook for execution.
///
/// Pipeline: resolve the image and render the RED document (pure, so
/// validation and configuration errors fire before any I/O), save the
/// notebook blob, submit to the agency, then insert the `Processing` row.
/// A failure after the blob is saved removes it again best-effort; a
/// failure after agency submission leaves no local row, only the remote
/// experiment (logged, never silently dropped).
pub async fn submit_notebook(
    state: &AppState,
    user: &User,
    params: &SubmitParams<'_>,
) -> AppResult<Notebook> {
    // 1. Pure preparation: any bad input must be rejected here.
    let container_image = resolve_image(params.image, &state.config.predefined_images)?;
    let notebook_id: NotebookId = Uuid::new_v4();
    let notebook_token = generate_notebook_token();

    let red = build_red_document(&RedParams {
        notebook_id,
        notebook_token: &notebook_token,
        agency_url: &user.agency_url,
        agency_username: &user.agency_username,
        url_root: &state.config.url_root,
        container_image: &container_image,
        gpus: params.gpus,
        external_data: params.external_data,
        has_python_requirements: params.python_requirements.is_some(),
    })?;

    let token_hash = hash_notebook_token(&notebook_token)
        .map_err(|e| CoreError::Internal(format!("Token hashing failed: {e}")))?;

    let notebook_bytes = serde_json::to_vec(params.notebook_data)
        .map_err(|e| AppError::BadRequest(format!("Notebook is not serializable JSON: {e}")))?;

    // 2. The agency cookie from the caller's last login.
    let cookie = CookieRepo::find_latest_for_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "No agency authorization on record; log in again".into(),
            ))
        })?;

    // 3. Persist the blob so the agency's connector can fetch it.
    let key = notebook_key(notebook_id);
    state.store.save(&key, &notebook_bytes).await?;

    // 4. Hand the experiment to the agency.
    let agency = AgencyApi::with_client(state.http.clone(), &user.agency_url);
    let experiment_id = match agency.submit_red(&cookie.cookie_text, &red).await {
        Ok(id) => id,
        Err(e) => {
            remove_blob_best_effort(state, &key).await;
            return Err(e.into());
        }
    };

    // 5. Record the job. If this fails the experiment keeps running
    //    remotely with nothing pointing at it, so the orphan is logged.
    let input = CreateNotebook {
        notebook_id,
        notebook_token_hash: token_hash,
        experiment_id: experiment_id.clone(),
        notebook_filename: params.filename.to_string(),
        execution_time: Utc::now().timestamp(),
        python_requirements: params.python_requirements.map(str::to_string),
        user_id: user.id,
    };
    let notebook = match NotebookRepo::create(&state.pool, &input).await {
        Ok(notebook) => notebook,
        Err(e) => {
            remove_blob_best_effort(state, &key).await;
            tracing::warn!(
                %notebook_id,
                experiment_id = %experiment_id,
                "Submitted experiment could not be recorded; it keeps running unreferenced",
            );
            return Err(e.into());
        }
    };

    tracing::info!(
        %notebook_id,
        experiment_id = %notebook.experiment_id,
        user_id = user.id,
        filename = %notebook.notebook_filename,
        "Notebook submitted",
    );

    Ok(notebook)
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Map a terminal batch state to the corresponding notebook status.
///
/// Non-terminal states (including unknown ones from newer agency
/// versions) return `None`; the job stays in `Processing`.
fn terminal_status(state: BatchState) -> Option<NotebookStatus> {
    match state {
        BatchState::Succeeded => Some(NotebookStatus::Success),
        BatchState::Failed => Some(NotebookStatus::Failure),
        BatchState::Cancelled => Some(NotebookStatus::Cancelled),
        _ => None,
    }
}

/// Bring a user's `Processing` jobs up to date with the agency.
///
/// Polls each job's experiment; a terminal batch state is written with a
/// conditional update, so concurrent passes are harmless. Jobs whose
/// experiment does not resolve to exactly one batch are skipped with a
/// warning. An agency error aborts the remaining pass; rows already
/// updated stay updated.
pub async fn reconcile_user_jobs(state: &AppState, user: &User) -> AppResult<()> {
    let cookie = CookieRepo::find_latest_for_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "No agency authorization on record; log in again".into(),
            ))
        })?;

    let jobs = NotebookRepo::list_processing_by_user(&state.pool, user.id).await?;
    if jobs.is_empty() {
        return Ok(());
    }

    let agency = AgencyApi::with_client(state.http.clone(), &user.agency_url);

    for job in jobs {
        let filter = BatchFilter::Experiment(job.experiment_id.clone());
        let batches = agency.list_batches(&cookie.cookie_text, &filter).await?;

        let batch = match single_batch(batches, &job.experiment_id) {
            Ok(batch) => batch,
            Err(error) => {
                tracing::warn!(
                    notebook_id = %job.notebook_id,
                    error = %error,
                    "Skipping job during reconciliation",
                );
                continue;
            }
        };

        let Some(status) = terminal_status(batch.state) else {
            continue;
        };

        // Failures carry diagnostics; a retrieval error becomes part of
        // the stored text so a reconciled failure is never silent.
        let debug_info = if status == NotebookStatus::Failure {
            Some(
                agency
                    .fetch_debug_info(&cookie.cookie_text, &batch.id)
                    .await
                    .unwrap_or_else(|e| format!("Failed to retrieve debug information: {e}")),
            )
        } else {
            None
        };

        let updated = NotebookRepo::update_status_if_processing(
            &state.pool,
            job.notebook_id,
            status,
            debug_info.as_deref(),
        )
        .await?;

        if updated {
            tracing::info!(
                notebook_id = %job.notebook_id,
                status = status.as_str(),
                "Notebook reached terminal status",
            );
        } else {
            tracing::debug!(
                notebook_id = %job.notebook_id,
                "Concurrent reconciliation already settled this job",
            );
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cancel a running notebook at the agency. Returns the cancelled batch ID.
///
/// Only the owner may cancel; the ownership check happens before any HTTP
/// call. Local status is not touched here, reconciliation picks up the
/// `cancelled` batch state on the next pass.
pub async fn cancel_notebook(
    state: &AppState,
    user: &User,
    notebook_id: NotebookId,
) -> AppResult<String> {
    let notebook = NotebookRepo::find_by_notebook_id(&state.pool, notebook_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notebook",
            id: notebook_id.to_string(),
        }))?;

    if notebook.user_id != user.id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot cancel another user's notebook".into(),
        )));
    }

    let cookie = CookieRepo::find_latest_for_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "No agency authorization on record; log in again".into(),
            ))
        })?;

    let agency = AgencyApi::with_client(state.http.clone(), &user.agency_url);
    let batch_id = agency
        .cancel_batch(&cookie.cookie_text, &notebook.experiment_id)
        .await?;

    tracing::info!(
        %notebook_id,
        batch_id = %batch_id,
        user_id = user.id,
        "Notebook cancellation requested",
    );

    Ok(batch_id)
}

// ---------------------------------------------------------------------------
// Callback authorization
// ---------------------------------------------------------------------------

/// Authenticate an agency connector callback against a notebook's token.
///
/// The connector presents the owner's agency username and the per-job
/// token as HTTP basic auth. The token hash is always verified, and a
/// username mismatch produces the same error as a token mismatch, so the
/// response does not leak which check failed.
pub async fn authorize_callback(
    state: &AppState,
    notebook_id: NotebookId,
    username: &str,
    token: &str,
) -> AppResult<Notebook> {
    let notebook = NotebookRepo::find_by_notebook_id(&state.pool, notebook_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notebook",
            id: notebook_id.to_string(),
        }))?;

    let owner = UserRepo::find_by_id(&state.pool, notebook.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Internal(format!(
                "Notebook {notebook_id} has no owning user"
            )))
        })?;

    let token_ok = verify_notebook_token(token, &notebook.notebook_token_hash)
        .map_err(|e| CoreError::Internal(format!("Token verification failed: {e}")))?;

    if !token_ok || username != owner.agency_username {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid notebook credentials".into(),
        )));
    }

    Ok(notebook)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Remove a blob, logging instead of failing; used on cleanup paths where
/// the original error must win.
async fn remove_blob_best_effort(state: &AppState, key: &str) {
    if let Err(e) = state.store.remove(key).await {
        tracing::warn!(key, error = %e, "Failed to clean up notebook blob");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_status_mapping() {
        assert_eq!(
            terminal_status(BatchState::Succeeded),
            Some(NotebookStatus::Success)
        );
        assert_eq!(
            terminal_status(BatchState::Failed),
            Some(NotebookStatus::Failure)
        );
        assert_eq!(
            terminal_status(BatchState::Cancelled),
            Some(NotebookStatus::Cancelled)
        );
    }

    #[test]
    fn test_non_terminal_states_keep_processing() {
        assert_eq!(terminal_status(BatchState::Registered), None);
        assert_eq!(terminal_status(BatchState::Scheduled), None);
        assert_eq!(terminal_status(BatchState::Processing), None);
        assert_eq!(terminal_status(BatchState::Unknown), None);
    }
}
