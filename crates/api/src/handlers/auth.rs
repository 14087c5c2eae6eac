//! Handlers for the `/auth` resource (login, logout).
//!
//! Login verifies credentials against the caller's CC-Agency deployment;
//! this service holds no passwords of its own. A successful login stores
//! the agency's authorization cookie and establishes a local web session.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use nbrelay_agency::api::{AgencyApi, AgencyApiError};
use nbrelay_core::error::CoreError;
use nbrelay_core::url::normalize_url;
use nbrelay_db::models::cookie::CreateAgencyCookie;
use nbrelay_db::models::session::CreateWebSession;
use nbrelay_db::models::user::{CreateUser, UserResponse};
use nbrelay_db::repositories::{CookieRepo, SessionRepo, UserRepo};

use crate::auth::session::generate_session_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, SESSION_COOKIE};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Base URL of the CC-Agency deployment to authenticate against.
    #[validate(length(min = 1, message = "agency_url must not be empty"))]
    pub agency_url: String,
    #[validate(length(min = 1, message = "agency_username must not be empty"))]
    pub agency_username: String,
    #[validate(length(min = 1, message = "agency_password must not be empty"))]
    pub agency_password: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Verify agency credentials, store the authorization cookie, and start a
/// web session. The session token travels in an `HttpOnly` cookie; the
/// body carries the resolved user.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    // 1. Reject empty fields before any network traffic.
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let agency_url = normalize_url(&input.agency_url);

    // 2. Verify against the agency; a rejected login maps to 401 here,
    //    anything else surfaces as an agency error.
    let agency = AgencyApi::with_client(state.http.clone(), &agency_url);
    let cookie_text = match agency
        .verify_credentials(&input.agency_username, &input.agency_password)
        .await
    {
        Ok(cookie) => cookie,
        Err(AgencyApiError::ApiError {
            status: 401 | 403, ..
        }) => {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid agency credentials".into(),
            )));
        }
        Err(e) => return Err(e.into()),
    };

    // 3. Resolve the local user for this (username, agency) identity.
    let user = UserRepo::get_or_create(
        &state.pool,
        &CreateUser {
            agency_username: input.agency_username.clone(),
            agency_url: agency_url.clone(),
        },
    )
    .await?;

    // 4. Store the fresh agency cookie for later submissions and polls.
    CookieRepo::create(
        &state.pool,
        &CreateAgencyCookie {
            cookie_text,
            user_id: user.id,
        },
    )
    .await?;

    // 5. Mint the web session.
    let (session_token, token_hash) = generate_session_token();
    let expires_at = Utc::now() + chrono::Duration::days(state.config.session_expiry_days);
    SessionRepo::create(
        &state.pool,
        &CreateWebSession {
            user_id: user.id,
            token_hash,
            expires_at,
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        agency_url = %user.agency_url,
        "User logged in",
    );

    let max_age_secs = state.config.session_expiry_days * 86_400;
    let headers = AppendHeaders([(SET_COOKIE, session_cookie(&session_token, max_age_secs))]);

    Ok((
        headers,
        Json(DataResponse {
            data: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/v1/auth/logout
///
/// Revoke all web sessions for the authenticated user and clear the
/// session cookie. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    SessionRepo::revoke_all_for_user(&state.pool, auth.user.id).await?;

    tracing::info!(user_id = auth.user.id, "User logged out");

    let headers = AppendHeaders([(SET_COOKIE, session_cookie("", 0))]);
    Ok((StatusCode::NO_CONTENT, headers))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Render the session `Set-Cookie` value. `max_age_secs = 0` clears the
/// cookie on logout.
fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}
