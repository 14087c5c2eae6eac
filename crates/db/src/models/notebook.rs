//! Notebook job entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use nbrelay_core::types::{DbId, NotebookId, Timestamp};

use super::status::{NotebookStatus, StatusId};

/// A row from the `notebooks` table.
///
/// Contains the notebook token hash -- NEVER serialize this to API
/// responses directly. Use [`NotebookResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct Notebook {
    pub id: DbId,
    /// Public identifier used in callback URLs and the client API.
    pub notebook_id: NotebookId,
    /// Argon2 hash of the per-job callback token.
    pub notebook_token_hash: String,
    /// Experiment ID assigned by the agency at submission time.
    pub experiment_id: String,
    pub status: StatusId,
    /// Original upload filename, echoed on result download.
    pub notebook_filename: String,
    /// Submission time as unix seconds; list ordering key.
    pub execution_time: i64,
    /// Stderr or scheduler history captured for failed runs.
    pub debug_info: Option<String>,
    /// Contents of an optional `requirements.txt` shipped with the job.
    pub python_requirements: Option<String>,
    pub user_id: DbId,
    pub created_at: Timestamp,
}

/// Safe notebook representation for API responses (no token hash, no
/// requirements payload).
#[derive(Debug, Clone, Serialize)]
pub struct NotebookResponse {
    pub notebook_id: NotebookId,
    pub notebook_filename: String,
    pub status: String,
    pub execution_time: i64,
    pub debug_info: Option<String>,
}

impl From<&Notebook> for NotebookResponse {
    fn from(notebook: &Notebook) -> Self {
        let status = NotebookStatus::from_id(notebook.status)
            .unwrap_or(NotebookStatus::Processing)
            .as_str()
            .to_string();
        Self {
            notebook_id: notebook.notebook_id,
            notebook_filename: notebook.notebook_filename.clone(),
            status,
            execution_time: notebook.execution_time,
            debug_info: notebook.debug_info.clone(),
        }
    }
}

/// DTO for inserting a submitted notebook job.
#[derive(Debug)]
pub struct CreateNotebook {
    pub notebook_id: NotebookId,
    pub notebook_token_hash: String,
    pub experiment_id: String,
    pub notebook_filename: String,
    pub execution_time: i64,
    pub python_requirements: Option<String>,
    pub user_id: DbId,
}
