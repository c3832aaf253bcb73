//! Exercise session routes. Every call returns the caller's session snapshot.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::exercise::SessionSnapshot;
use crate::services::exercise_runner;
use crate::state::AppState;

/// `GET /api/exercise`
pub async fn get_session(State(state): State<AppState>, auth: AuthUser) -> Json<SessionSnapshot> {
    Json(exercise_runner::snapshot(&state, auth.user.id).await)
}

/// `POST /api/exercise/start`
pub async fn start(State(state): State<AppState>, auth: AuthUser) -> Json<SessionSnapshot> {
    Json(exercise_runner::start(&state, auth.user.id).await)
}

/// `POST /api/exercise/pause`
pub async fn pause(State(state): State<AppState>, auth: AuthUser) -> Json<SessionSnapshot> {
    Json(exercise_runner::pause(&state, auth.user.id).await)
}

/// `POST /api/exercise/reset`
pub async fn reset(State(state): State<AppState>, auth: AuthUser) -> Json<SessionSnapshot> {
    Json(exercise_runner::reset(&state, auth.user.id).await)
}

/// `DELETE /api/exercise` — the patient left the session screen.
pub async fn end(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode, ApiError> {
    exercise_runner::end(&state, auth.user.id)
        .await
        .map_err(|e| ApiError::new(StatusCode::NOT_FOUND, &e))?;
    Ok(StatusCode::NO_CONTENT)
}
