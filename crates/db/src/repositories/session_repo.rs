//! Repository for the `web_sessions` table.

use sqlx::PgPool;

use nbrelay_core::types::DbId;

use crate::models::session::{CreateWebSession, WebSession};

/// Shared column list keeps every query returning the same row shape.
const COLUMNS: &str = "id, user_id, token_hash, expires_at, is_revoked, created_at";

/// Provides CRUD operations for web sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a session row and return it.
    pub async fn create(pool: &PgPool, input: &CreateWebSession) -> Result<WebSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO web_sessions (user_id, token_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebSession>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find an active session by its token hash.
    ///
    /// Only returns sessions that are not revoked and not expired.
    pub async fn find_active_by_token_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<WebSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM web_sessions
             WHERE token_hash = $1
               AND is_revoked = false
               AND expires_at > NOW()"
        );
        sqlx::query_as::<_, WebSession>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Revoke every active session for a user, returning how many were revoked.
    pub async fn revoke_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE web_sessions SET is_revoked = true
             WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that are expired or revoked, returning the deleted count.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM web_sessions WHERE expires_at < NOW() OR is_revoked = true")
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
