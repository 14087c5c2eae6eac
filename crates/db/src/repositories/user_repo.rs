//! Repository for the `users` table.

use sqlx::PgPool;

use nbrelay_core::types::DbId;

use crate::models::user::{CreateUser, User};

/// Shared column list keeps every query returning the same row shape.
const COLUMNS: &str = "id, agency_username, agency_url, created_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Resolve the user row for an (agency username, agency URL) pair,
    /// inserting it on first login.
    ///
    /// The upsert keeps logins idempotent: repeated logins against the
    /// same agency identity always land on the same row.
    pub async fn get_or_create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (agency_username, agency_url)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_users_agency_identity
             DO UPDATE SET agency_username = EXCLUDED.agency_username
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.agency_username)
            .bind(&input.agency_url)
            .fetch_one(pool)
            .await
    }

    /// Find a user by their ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
