//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the patient API under `/api` plus an unauthenticated health probe.
//! Every `/api` route except the doctor list requires an [`auth::AuthUser`].

pub mod auth;
pub mod chat;
pub mod doctors;
pub mod exercise;
pub mod posts;
pub mod profile;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/{id}/like", post(posts::toggle_like))
        .route("/api/chat", post(chat::chat))
        .route("/api/exercise", get(exercise::get_session).delete(exercise::end))
        .route("/api/exercise/start", post(exercise::start))
        .route("/api/exercise/pause", post(exercise::pause))
        .route("/api/exercise/reset", post(exercise::reset))
        .route("/api/profile", get(profile::get_profile).patch(profile::update_profile))
        .route("/api/progress", get(profile::get_progress))
        .route("/api/doctors", get(doctors::list_doctors))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
