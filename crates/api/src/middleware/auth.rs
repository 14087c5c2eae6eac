//! Session-cookie authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use nbrelay_core::error::CoreError;
use nbrelay_db::models::user::User;
use nbrelay_db::repositories::{SessionRepo, UserRepo};

use crate::auth::session::hash_session_token;
use crate::error::AppError;
use crate::state::AppState;

/// Name of the session cookie set on login and read back on every request.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated user extracted from the `session` cookie.
///
/// Use this as an extractor parameter in any handler that requires authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The full user row the session resolves to.
    pub user: User,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing session cookie".into()))
            })?;

        let token = parse_cookie(cookie_header, SESSION_COOKIE).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Missing session cookie".into()))
        })?;

        let hash = hash_session_token(token);
        let session = SessionRepo::find_active_by_token_hash(&state.pool, &hash)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Invalid or expired session".into()))
            })?;

        let user = UserRepo::find_by_id(&state.pool, session.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Invalid or expired session".into()))
            })?;

        Ok(AuthUser { user })
    }
}

/// Extract the value of a named cookie from a `Cookie` header value.
///
/// Cookie pairs are separated by `; ` per RFC 6265; values are returned
/// verbatim (no unquoting).
fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_single_pair() {
        assert_eq!(parse_cookie("session=abc123", "session"), Some("abc123"));
    }

    #[test]
    fn test_parse_cookie_among_others() {
        let header = "theme=dark; session=tok-1; lang=en";
        assert_eq!(parse_cookie(header, "session"), Some("tok-1"));
    }

    #[test]
    fn test_parse_cookie_missing_name() {
        assert_eq!(parse_cookie("theme=dark; lang=en", "session"), None);
    }

    #[test]
    fn test_parse_cookie_name_is_not_a_prefix_match() {
        // `session2` must not satisfy a lookup for `session`.
        assert_eq!(parse_cookie("session2=oops", "session"), None);
    }

    #[test]
    fn test_parse_cookie_empty_value() {
        assert_eq!(parse_cookie("session=", "session"), Some(""));
    }
}
