//! Doctor chat route.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::llm::types::{Message, Role};
use crate::services::chat::{self, AiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub doctor_id: String,
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

/// `POST /api/chat` — one persona reply. LLM failures come back as a
/// `200` with `success = false`; only rate limits and bad input are errors.
pub async fn chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ChatBody>,
) -> Result<Json<AiResponse>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::bare(StatusCode::BAD_REQUEST, "E_EMPTY_MESSAGE", "message must not be empty"));
    }
    let user_id = auth.user.id;

    state.rate_limiter.check_and_record(user_id).map_err(|e| {
        tracing::warn!(%user_id, error = %e, "chat: rate limited");
        ApiError::new(StatusCode::TOO_MANY_REQUESTS, &e)
    })?;

    // Clients only replay their own conversation.
    let history: Vec<Message> = body
        .history
        .into_iter()
        .filter(|m| m.role != Role::System)
        .collect();

    let outcome = chat::generate_response(state.llm.as_ref(), user_id, &body.message, &body.doctor_id, &history).await;
    if outcome.tokens_used > 0 {
        state.rate_limiter.record_tokens(user_id, outcome.tokens_used);
    }
    Ok(Json(outcome.response))
}
