//! Chat service — persona prompt → single completion → patient-facing reply.
//!
//! DESIGN
//! ======
//! One request per user message. The persona is resolved first so an
//! unknown doctor never reaches the LLM. The system instruction embeds the
//! persona attributes plus fixed reply rules; recent history is bounded and
//! sent verbatim ahead of the new message.
//!
//! ERROR HANDLING
//! ==============
//! Failures never escape as errors. They are logged and folded into an
//! [`AiResponse`] with `success = false` and a fixed fallback `content`, so
//! the caller always has something to show. There is no retry.

use std::fmt::Write;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::doctor::{self, DoctorContext};
use crate::llm::LlmChat;
use crate::llm::types::{ChatParams, LlmError, Message};
use crate::rate_limit::env_parse;

pub const DOCTOR_NOT_FOUND_REPLY: &str = "I'm sorry, I couldn't find the doctor you're trying to reach.";
pub const DOCTOR_NOT_FOUND_ERROR: &str = "Doctor not found";
pub const TECHNICAL_DIFFICULTIES_REPLY: &str =
    "I'm experiencing some technical difficulties. Please try again in a moment.";
pub const EMPTY_COMPLETION_REPLY: &str = "I'm sorry, I couldn't generate a response.";

const DEFAULT_CHAT_HISTORY_LIMIT: usize = 10;
const DEFAULT_CHAT_MAX_TOKENS: u32 = 512;
const CHAT_TEMPERATURE: f32 = 0.7;

fn chat_history_limit() -> usize {
    static VALUE: OnceLock<usize> = OnceLock::new();
    *VALUE.get_or_init(|| env_parse("CHAT_HISTORY_LIMIT", DEFAULT_CHAT_HISTORY_LIMIT))
}

fn chat_max_tokens() -> u32 {
    static VALUE: OnceLock<u32> = OnceLock::new();
    *VALUE.get_or_init(|| env_parse("CHAT_MAX_TOKENS", DEFAULT_CHAT_MAX_TOKENS))
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("LLM not configured")]
    LlmNotConfigured,
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Reply shape returned to the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiResponse {
    fn ok(content: String) -> Self {
        Self { content, success: true, error: None }
    }

    fn failed(content: &str, error: impl Into<String>) -> Self {
        Self { content: content.to_owned(), success: false, error: Some(error.into()) }
    }
}

/// Completed reply plus the tokens it consumed (for budget accounting).
#[derive(Debug)]
pub struct ChatOutcome {
    pub response: AiResponse,
    pub tokens_used: u64,
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Ask `doctor_id`'s persona to reply to `message`, given recent `history`.
pub async fn generate_response(
    llm: Option<&Arc<dyn LlmChat>>,
    user_id: Uuid,
    message: &str,
    doctor_id: &str,
    history: &[Message],
) -> ChatOutcome {
    let Some(doctor) = doctor::find(doctor_id) else {
        info!(%user_id, doctor_id, "chat: unknown doctor");
        return ChatOutcome {
            response: AiResponse::failed(DOCTOR_NOT_FOUND_REPLY, DOCTOR_NOT_FOUND_ERROR),
            tokens_used: 0,
        };
    };

    match request_completion(llm, doctor, message, history).await {
        Ok((content, tokens_used)) => {
            info!(%user_id, doctor = doctor.id, tokens_used, "chat: reply generated");
            let content = content.unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_owned());
            ChatOutcome { response: AiResponse::ok(content), tokens_used }
        }
        Err(e) => {
            warn!(%user_id, doctor = doctor.id, error = %e, "chat: completion failed");
            ChatOutcome { response: AiResponse::failed(TECHNICAL_DIFFICULTIES_REPLY, e.to_string()), tokens_used: 0 }
        }
    }
}

async fn request_completion(
    llm: Option<&Arc<dyn LlmChat>>,
    doctor: &DoctorContext,
    message: &str,
    history: &[Message],
) -> Result<(Option<String>, u64), ChatError> {
    let llm = llm.ok_or(ChatError::LlmNotConfigured)?;
    let system = build_system_prompt(doctor);

    let mut messages = bounded_history(history, chat_history_limit()).to_vec();
    messages.push(Message::user(message));

    let params = ChatParams { max_tokens: chat_max_tokens(), temperature: CHAT_TEMPERATURE };
    let response = llm.chat(params, &system, &messages).await?;
    Ok((response.content, response.input_tokens + response.output_tokens))
}

/// Keep only the most recent `limit` turns.
pub(crate) fn bounded_history(history: &[Message], limit: usize) -> &[Message] {
    &history[history.len().saturating_sub(limit)..]
}

// =============================================================================
// PROMPT
// =============================================================================

pub(crate) fn build_system_prompt(doctor: &DoctorContext) -> String {
    let mut s = String::with_capacity(1536);
    let _ = writeln!(s, "You are {}, a {} with {}.", doctor.name, doctor.specialty, doctor.experience);
    let _ = writeln!(s, "Your personality: {}.", doctor.personality);
    s.push_str(
        "
INSTRUCTIONS FOR REPLY:

1. Keep responses brief, helpful, and natural. No fluff or long paragraphs.
2. Speak like a real, caring physiotherapist, not a chatbot.
3. Avoid all formatting (no asterisks, numbered lists, emojis, markdown).
4. Use short, clear paragraphs with one idea per sentence.
5. Be warm, positive, and supportive, but don't overdo it.
6. Give quick, practical advice. Focus on what the patient should do next.
7. Never copy or repeat the user's question. Respond naturally.
8. Acknowledge progress or discomfort in 1-2 lines.
9. If there's pain, recommend stopping and checking with a physio.
10. Do not give medical diagnoses. Refer to a real professional if unsure.
11. End with a short check-in or supportive line (e.g. \"Let me know how that goes.\" / \"You're on the right track.\" / \"Happy to adjust if needed.\").

TONE: Friendly, efficient, and human. Not robotic or overly formal.
LENGTH: 1-2 short paragraphs max. No long essays.",
    );
    s
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
