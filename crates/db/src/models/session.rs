//! Web session entity model and DTOs.

use sqlx::FromRow;

use nbrelay_core::types::{DbId, Timestamp};

/// A row from the `web_sessions` table.
///
/// Stores only the SHA-256 hash of the session token; the plaintext lives
/// in the browser cookie.
#[derive(Debug, Clone, FromRow)]
pub struct WebSession {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a new web session.
#[derive(Debug)]
pub struct CreateWebSession {
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
}
