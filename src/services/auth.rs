//! Hosted auth service — bearer token validation against the auth provider.
//!
//! The provider owns sign-up, sign-in and token refresh. This server only
//! asks it who a token belongs to (`GET {AUTH_URL}/auth/v1/user`) and never
//! writes user records of its own.

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ErrorCode;

/// Hosted auth configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct HostedAuthConfig {
    pub base_url: String,
    pub anon_key: String,
}

impl HostedAuthConfig {
    /// Load from `AUTH_URL` and `AUTH_ANON_KEY`.
    /// Returns `None` if either is missing (token auth will be disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("AUTH_URL").ok()?;
        let anon_key = std::env::var("AUTH_ANON_KEY").ok()?;
        Self::new(&base_url, anon_key)
    }

    #[must_use]
    pub fn new(base_url: &str, anon_key: String) -> Option<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() || anon_key.trim().is_empty() {
            return None;
        }
        Some(Self { base_url: base_url.to_owned(), anon_key })
    }

    #[must_use]
    pub fn user_url(&self) -> String {
        format!("{}/auth/v1/user", self.base_url)
    }
}

/// The signed-in patient, as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth provider not configured")]
    NotConfigured,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("auth provider error: {0}")]
    Upstream(String),
    #[error("unexpected auth provider response: {0}")]
    Parse(String),
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "E_AUTH_NOT_CONFIGURED",
            Self::InvalidToken => "E_UNAUTHORIZED",
            Self::Upstream(_) => "E_AUTH_UPSTREAM",
            Self::Parse(_) => "E_AUTH_PARSE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: ProviderMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderMetadata {
    avatar_url: Option<String>,
}

/// Parse the provider's user document.
///
/// # Errors
///
/// Returns [`AuthError::Parse`] if the body is not a user object with a UUID id.
pub fn parse_user(body: &str) -> Result<SessionUser, AuthError> {
    let user: ProviderUser = serde_json::from_str(body).map_err(|e| AuthError::Parse(e.to_string()))?;
    let avatar_url = user.user_metadata.avatar_url.filter(|url| !url.trim().is_empty());
    Ok(SessionUser { id: user.id, email: user.email, avatar_url })
}

/// Resolve a bearer token to its user.
///
/// # Errors
///
/// [`AuthError::InvalidToken`] when the provider rejects the token,
/// [`AuthError::Upstream`] for transport failures and other non-2xx replies.
pub async fn fetch_user(http: &reqwest::Client, config: &HostedAuthConfig, token: &str) -> Result<SessionUser, AuthError> {
    let resp = http
        .get(config.user_url())
        .bearer_auth(token)
        .header("apikey", &config.anon_key)
        .send()
        .await
        .map_err(|e| AuthError::Upstream(e.to_string()))?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AuthError::InvalidToken);
    }
    let body = resp.text().await.map_err(|e| AuthError::Upstream(e.to_string()))?;
    if !status.is_success() {
        return Err(AuthError::Upstream(format!("{status}: {body}")));
    }
    parse_user(&body)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
