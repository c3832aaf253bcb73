//! Profile and progress routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::profile::{self, Profile, ProfileError, ProfileUpdate, Progress};
use crate::state::AppState;

/// Stored profile plus fields derived for display.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub email: Option<String>,
    pub recovery_label: String,
}

fn profile_error(err: ProfileError) -> ApiError {
    let status = match &err {
        ProfileError::UnknownDoctor(_) => StatusCode::BAD_REQUEST,
        ProfileError::Database(_) => {
            tracing::error!(error = %err, "profile: database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ApiError::new(status, &err)
}

fn respond(profile: Profile, email: Option<String>) -> Json<ProfileResponse> {
    let recovery_label = profile.recovery_label();
    Json(ProfileResponse { profile, email, recovery_label })
}

/// `GET /api/profile`
pub async fn get_profile(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = profile::get_or_create(&state.pool, auth.user.id, auth.user.avatar_url.as_deref())
        .await
        .map_err(profile_error)?;
    Ok(respond(profile, auth.user.email))
}

/// `PATCH /api/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(patch): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = profile::update(&state.pool, auth.user.id, &patch)
        .await
        .map_err(profile_error)?;
    tracing::info!(user_id = %auth.user.id, "profile: updated");
    Ok(respond(profile, auth.user.email))
}

/// `GET /api/progress`
pub async fn get_progress(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Progress>, ApiError> {
    let progress = profile::progress(&state.pool, auth.user.id)
        .await
        .map_err(profile_error)?;
    Ok(Json(progress))
}
