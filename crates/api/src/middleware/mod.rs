//! Authentication middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from the session cookie.

pub mod auth;
