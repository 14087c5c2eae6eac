//! Agency authorization cookie model.

use sqlx::FromRow;

use nbrelay_core::types::{DbId, Timestamp};

/// A row from the `agency_cookies` table.
///
/// Each successful agency login appends a new row; lookups always take
/// the newest one. Cookie values are opaque agency secrets and must never
/// appear in API responses or logs.
#[derive(Debug, Clone, FromRow)]
pub struct AgencyCookie {
    pub id: DbId,
    pub cookie_text: String,
    pub user_id: DbId,
    pub created_at: Timestamp,
}

/// DTO for storing a freshly obtained cookie.
#[derive(Debug)]
pub struct CreateAgencyCookie {
    pub cookie_text: String,
    pub user_id: DbId,
}
