//! Feed routes — tabbed post list and like toggling.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::feed::{self, Category, FeedError, FeedPost, LikeToggle};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub tab: Option<String>,
    pub q: Option<String>,
}

pub(crate) fn feed_error(err: FeedError) -> ApiError {
    let status = match &err {
        FeedError::NotFound(_) => StatusCode::NOT_FOUND,
        FeedError::InvalidCategory(_) => StatusCode::BAD_REQUEST,
        FeedError::Database(_) | FeedError::Profile(_) => {
            tracing::error!(error = %err, "feed: request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ApiError::new(status, &err)
}

/// `GET /api/posts?tab=&q=`
pub async fn list_posts(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedPost>>, ApiError> {
    let tab = match query.tab.as_deref().map(str::trim) {
        None | Some("") => Category::All,
        Some(raw) => Category::parse(raw).map_err(feed_error)?,
    };
    let search = query.q.as_deref().unwrap_or_default();
    let posts = feed::feed_for_user(&state, auth.user.id, tab, search)
        .await
        .map_err(feed_error)?;
    Ok(Json(posts))
}

/// `POST /api/posts/{id}/like`
pub async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<LikeToggle>, ApiError> {
    let toggle = feed::toggle_like(&state, auth.user.id, post_id)
        .await
        .map_err(feed_error)?;
    Ok(Json(toggle))
}
