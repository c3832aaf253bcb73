//! Feed service — category tabs, search, and optimistic likes.
//!
//! DESIGN
//! ======
//! Posts are read straight from the `posts` table on every request. Which
//! posts a user has liked is held in memory per user (`AppState::likes`);
//! the counter shown to the user moves immediately and the new value is then
//! written back with one unconditional `UPDATE`.
//!
//! ERROR HANDLING
//! ==============
//! A failed counter write is logged and swallowed: the caller still sees
//! the optimistic value. Concurrent likes from different users may overwrite
//! each other's counter write; there is no conflict resolution.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{info, warn};
use uuid::Uuid;

use super::profile::{self, ProfileError};
use crate::error::ErrorCode;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("post not found: {0}")]
    NotFound(Uuid),
    #[error("unknown feed category: {0}")]
    InvalidCategory(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),
}

impl ErrorCode for FeedError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_POST_NOT_FOUND",
            Self::InvalidCategory(_) => "E_INVALID_CATEGORY",
            Self::Database(_) => "E_DATABASE",
            Self::Profile(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Database(_) => true,
            Self::Profile(e) => e.retryable(),
            Self::NotFound(_) | Self::InvalidCategory(_) => false,
        }
    }
}

/// Feed tab. Also the `category` column of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    All,
    MyDoctor,
    ExerciseTips,
    Inspiration,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::MyDoctor => "my-doctor",
            Self::ExerciseTips => "exercise-tips",
            Self::Inspiration => "inspiration",
        }
    }

    /// # Errors
    ///
    /// Returns [`FeedError::InvalidCategory`] for anything but the four tab keys.
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        match raw {
            "all" => Ok(Self::All),
            "my-doctor" => Ok(Self::MyDoctor),
            "exercise-tips" => Ok(Self::ExerciseTips),
            "inspiration" => Ok(Self::Inspiration),
            other => Err(FeedError::InvalidCategory(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: String,
    pub author_name: String,
    pub author_title: String,
    pub author_avatar: String,
    pub author_verified: bool,
    pub content: String,
    pub image_url: Option<String>,
    pub likes: i32,
    pub comments: i32,
    pub tags: Vec<String>,
    pub category: Category,
    pub created_at: String,
}

/// A post as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub liked_by_me: bool,
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub post_id: Uuid,
    pub liked: bool,
    pub likes: i32,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Case-insensitive substring match on content, author name, or any tag.
/// An empty query matches everything.
#[must_use]
pub fn matches_search(post: &Post, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    post.content.to_lowercase().contains(&needle)
        || post.author_name.to_lowercase().contains(&needle)
        || post
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Flip membership of `post_id` in a user's liked set. Returns the new state.
pub fn toggle_membership(liked: &mut HashSet<Uuid>, post_id: Uuid) -> bool {
    if liked.remove(&post_id) {
        false
    } else {
        liked.insert(post_id);
        true
    }
}

/// The displayed counter after a toggle. Never drops below zero.
#[must_use]
pub fn adjust_count(current: i32, now_liked: bool) -> i32 {
    if now_liked { current.saturating_add(1) } else { current.saturating_sub(1).max(0) }
}

// =============================================================================
// QUERIES
// =============================================================================

const POST_COLUMNS: &str = r#"id, author_id, author_name, author_title, author_avatar, author_verified,
       content, image_url, likes, comments, tags, category,
       to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at"#;

fn row_to_post(row: &sqlx::postgres::PgRow) -> Post {
    let category: String = row.get("category");
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        author_title: row.get("author_title"),
        author_avatar: row.get("author_avatar"),
        author_verified: row.get("author_verified"),
        content: row.get("content"),
        image_url: row.get("image_url"),
        likes: row.get("likes"),
        comments: row.get("comments"),
        tags: row.get("tags"),
        category: Category::parse(&category).unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

/// Newest-first posts for a tab. `author_id` narrows the result further and
/// is only applied for the "my doctor" tab.
pub async fn list_posts(pool: &PgPool, tab: Category, author_id: Option<&str>) -> Result<Vec<Post>, FeedError> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
    qb.push(POST_COLUMNS).push(" FROM posts WHERE TRUE");
    if tab != Category::All {
        qb.push(" AND category = ").push_bind(tab.as_str());
    }
    if let (Category::MyDoctor, Some(author)) = (tab, author_id) {
        qb.push(" AND author_id = ").push_bind(author);
    }
    qb.push(" ORDER BY created_at DESC");

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_post).collect())
}

/// Load a tab, apply search, and mark the caller's likes.
pub async fn feed_for_user(
    state: &AppState,
    user_id: Uuid,
    tab: Category,
    search: &str,
) -> Result<Vec<FeedPost>, FeedError> {
    let preferred = if tab == Category::MyDoctor {
        profile::preferred_doctor(&state.pool, user_id).await?
    } else {
        None
    };

    let posts = list_posts(&state.pool, tab, preferred.as_deref()).await?;
    let likes = state.likes.read().await;
    let liked = likes.get(&user_id);
    Ok(posts
        .into_iter()
        .filter(|p| matches_search(p, search))
        .map(|post| {
            let liked_by_me = liked.is_some_and(|set| set.contains(&post.id));
            FeedPost { post, liked_by_me }
        })
        .collect())
}

/// Like or unlike a post for `user_id`.
pub async fn toggle_like(state: &AppState, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle, FeedError> {
    let current: i32 = sqlx::query("SELECT likes FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(FeedError::NotFound(post_id))?
        .get("likes");

    let liked = {
        let mut likes = state.likes.write().await;
        toggle_membership(likes.entry(user_id).or_default(), post_id)
    };
    let likes = adjust_count(current, liked);
    info!(%user_id, %post_id, liked, likes, "feed: like toggled");

    if let Err(e) = write_like_count(&state.pool, post_id, likes).await {
        warn!(%post_id, error = %e, "feed: failed to persist like count");
    }

    Ok(LikeToggle { post_id, liked, likes })
}

async fn write_like_count(pool: &PgPool, post_id: Uuid, likes: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET likes = $1 WHERE id = $2")
        .bind(likes)
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod tests;
