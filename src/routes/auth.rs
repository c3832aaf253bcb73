//! Auth extractor — bearer token (or dev header) to [`SessionUser`].

use axum::extract::{FromRef, FromRequestParts};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use uuid::Uuid;

use crate::error::{ApiError, ErrorCode};
use crate::services::auth::{self as auth_svc, AuthError, SessionUser};
use crate::state::AppState;

/// Header honoured in place of a bearer token when `AUTH_DEV_BYPASS` is on.
pub const DEV_USER_HEADER: &str = "x-dev-user-id";

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Upstream(_) | AuthError::Parse(_) => StatusCode::BAD_GATEWAY,
    }
}

fn dev_user(parts: &Parts) -> Option<SessionUser> {
    let raw = parts.headers.get(DEV_USER_HEADER)?.to_str().ok()?;
    let id = Uuid::parse_str(raw.trim()).ok()?;
    Some(SessionUser { id, email: None, avatar_url: None })
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated patient. Use as a handler parameter to require sign-in.
pub struct AuthUser {
    pub user: SessionUser,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        if app_state.dev_bypass {
            if let Some(user) = dev_user(parts) {
                return Ok(Self { user });
            }
        }

        let TypedHeader(Authorization(bearer)) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bare(StatusCode::UNAUTHORIZED, "E_UNAUTHORIZED", "missing bearer token"))?;

        let Some(config) = &app_state.auth else {
            return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, &AuthError::NotConfigured));
        };

        let user = auth_svc::fetch_user(&app_state.http, config, bearer.token())
            .await
            .map_err(|e| {
                if e.retryable() {
                    tracing::error!(error = %e, "auth: provider lookup failed");
                }
                ApiError::new(auth_status(&e), &e)
            })?;
        Ok(Self { user })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
