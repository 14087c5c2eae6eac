//! Handler for the predefined image catalog.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// One selectable image as shown in the submit UI. The docker reference
/// itself stays server-side.
#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub name: String,
    pub description: String,
}

/// GET /api/v1/images
///
/// List the configured predefined images users may pick by name.
pub async fn list_images(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let data: Vec<ImageInfo> = state
        .config
        .predefined_images
        .iter()
        .map(|image| ImageInfo {
            name: image.name.clone(),
            description: image.description.clone(),
        })
        .collect();

    Ok(Json(DataResponse { data }))
}
