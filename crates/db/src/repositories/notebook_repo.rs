//! Repository for the `notebooks` table.
//!
//! Status values come from `NotebookStatus` in `models::status`; no query
//! embeds a bare status literal.

use sqlx::PgPool;

use nbrelay_core::types::{DbId, NotebookId};

use crate::models::notebook::{CreateNotebook, Notebook};
use crate::models::status::NotebookStatus;

/// Column list for `notebooks` queries.
const COLUMNS: &str = "\
    id, notebook_id, notebook_token_hash, experiment_id, status, \
    notebook_filename, execution_time, debug_info, python_requirements, \
    user_id, created_at";

/// Provides CRUD operations for notebook jobs.
pub struct NotebookRepo;

impl NotebookRepo {
    /// Insert a submitted notebook job in `Processing` state.
    pub async fn create(pool: &PgPool, input: &CreateNotebook) -> Result<Notebook, sqlx::Error> {
        let query = format!(
            "INSERT INTO notebooks \
                 (notebook_id, notebook_token_hash, experiment_id, status, \
                  notebook_filename, execution_time, python_requirements, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notebook>(&query)
            .bind(input.notebook_id)
            .bind(&input.notebook_token_hash)
            .bind(&input.experiment_id)
            .bind(NotebookStatus::Processing.id())
            .bind(&input.notebook_filename)
            .bind(input.execution_time)
            .bind(&input.python_requirements)
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    /// Find a notebook job by its public identifier.
    pub async fn find_by_notebook_id(
        pool: &PgPool,
        notebook_id: NotebookId,
    ) -> Result<Option<Notebook>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notebooks WHERE notebook_id = $1");
        sqlx::query_as::<_, Notebook>(&query)
            .bind(notebook_id)
            .fetch_optional(pool)
            .await
    }

    /// List all notebook jobs for a user, newest submission first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Notebook>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notebooks \
             WHERE user_id = $1 \
             ORDER BY execution_time DESC, id DESC"
        );
        sqlx::query_as::<_, Notebook>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// List a user's jobs still awaiting a terminal status.
    pub async fn list_processing_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Notebook>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notebooks \
             WHERE user_id = $1 AND status = $2 \
             ORDER BY execution_time DESC, id DESC"
        );
        sqlx::query_as::<_, Notebook>(&query)
            .bind(user_id)
            .bind(NotebookStatus::Processing.id())
            .fetch_all(pool)
            .await
    }

    /// Move a job from `Processing` to a terminal status, optionally
    /// attaching debug info.
    ///
    /// The `status = Processing` guard makes the transition monotonic:
    /// concurrent reconciliation passes cannot overwrite a terminal state,
    /// and at most one caller observes `true`.
    pub async fn update_status_if_processing(
        pool: &PgPool,
        notebook_id: NotebookId,
        status: NotebookStatus,
        debug_info: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notebooks \
             SET status = $2, debug_info = $3 \
             WHERE notebook_id = $1 AND status = $4",
        )
        .bind(notebook_id)
        .bind(status.id())
        .bind(debug_info)
        .bind(NotebookStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
