//! Repository for the `agency_cookies` table.

use sqlx::PgPool;

use nbrelay_core::types::DbId;

use crate::models::cookie::{AgencyCookie, CreateAgencyCookie};

/// Shared column list keeps every query returning the same row shape.
const COLUMNS: &str = "id, cookie_text, user_id, created_at";

/// Provides CRUD operations for agency authorization cookies.
pub struct CookieRepo;

impl CookieRepo {
    /// Insert a freshly obtained cookie and return the stored row.
    ///
    /// Rows accumulate; [`CookieRepo::find_latest_for_user`] always picks
    /// the newest one, so stale cookies need no eager cleanup.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAgencyCookie,
    ) -> Result<AgencyCookie, sqlx::Error> {
        let query = format!(
            "INSERT INTO agency_cookies (cookie_text, user_id)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AgencyCookie>(&query)
            .bind(&input.cookie_text)
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    /// Find the most recently stored cookie for a user.
    ///
    /// Ties on `created_at` are broken by the higher row ID so the pick
    /// stays deterministic.
    pub async fn find_latest_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<AgencyCookie>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM agency_cookies
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, AgencyCookie>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
