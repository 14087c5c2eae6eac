//! User entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use nbrelay_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// A user is identified by the (agency username, agency URL) pair; the
/// service never stores the agency password.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub agency_username: String,
    /// Normalized agency base URL (trailing slash).
    pub agency_url: String,
    pub created_at: Timestamp,
}

/// Safe user representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub agency_username: String,
    pub agency_url: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            agency_username: user.agency_username.clone(),
            agency_url: user.agency_url.clone(),
        }
    }
}

/// DTO for creating (or re-resolving) a user.
#[derive(Debug)]
pub struct CreateUser {
    pub agency_username: String,
    pub agency_url: String,
}
