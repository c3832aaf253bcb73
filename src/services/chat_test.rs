use super::*;
use crate::llm::openai::parse_chat_completions_response;
use crate::llm::types::{ChatResponse, Role};
use std::sync::Mutex;

// =========================================================================
// MockLlm
// =========================================================================

/// Records every call and replays canned results in order.
struct MockLlm {
    results: Mutex<Vec<Result<ChatResponse, LlmError>>>,
    calls: Mutex<Vec<(ChatParams, String, Vec<Message>)>>,
}

impl MockLlm {
    fn new(results: Vec<Result<ChatResponse, LlmError>>) -> Arc<Self> {
        Arc::new(Self { results: Mutex::new(results), calls: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> Vec<(ChatParams, String, Vec<Message>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmChat for MockLlm {
    async fn chat(&self, params: ChatParams, system: &str, messages: &[Message]) -> Result<ChatResponse, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((params, system.to_owned(), messages.to_vec()));
        let mut results = self.results.lock().unwrap();
        if results.is_empty() { Ok(text_response(Some("ok"))) } else { results.remove(0) }
    }
}

fn text_response(content: Option<&str>) -> ChatResponse {
    ChatResponse {
        content: content.map(str::to_owned),
        model: "mock".into(),
        stop_reason: "end_turn".into(),
        input_tokens: 40,
        output_tokens: 2,
    }
}

fn as_dyn(mock: &Arc<MockLlm>) -> Arc<dyn LlmChat> {
    mock.clone()
}

// =========================================================================
// generate_response
// =========================================================================

#[tokio::test]
async fn known_doctor_returns_model_text() {
    let mock = MockLlm::new(vec![Ok(text_response(Some("Ice it for ten minutes.")))]);
    let llm = as_dyn(&mock);

    let out = generate_response(Some(&llm), Uuid::new_v4(), "my knee is sore", "mitchell", &[]).await;

    assert_eq!(out.response, AiResponse { content: "Ice it for ten minutes.".into(), success: true, error: None });
    assert_eq!(out.tokens_used, 42);
}

#[tokio::test]
async fn every_doctor_produces_success_shape() {
    for doctor in doctor::DOCTORS {
        let mock = MockLlm::new(vec![]);
        let llm = as_dyn(&mock);
        let out = generate_response(Some(&llm), Uuid::new_v4(), "hello", doctor.id, &[]).await;
        assert!(out.response.success, "doctor {} should succeed", doctor.id);
        assert!(!out.response.content.is_empty());
    }
}

#[tokio::test]
async fn unknown_doctor_fails_without_calling_llm() {
    let mock = MockLlm::new(vec![]);
    let llm = as_dyn(&mock);

    let out = generate_response(Some(&llm), Uuid::new_v4(), "hello", "house", &[]).await;

    assert!(!out.response.success);
    assert_eq!(out.response.content, DOCTOR_NOT_FOUND_REPLY);
    assert_eq!(out.response.error.as_deref(), Some(DOCTOR_NOT_FOUND_ERROR));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn empty_completion_uses_fallback_text() {
    let mock = MockLlm::new(vec![Ok(text_response(None))]);
    let llm = as_dyn(&mock);

    let out = generate_response(Some(&llm), Uuid::new_v4(), "hi", "chen", &[]).await;

    assert!(out.response.success);
    assert_eq!(out.response.content, EMPTY_COMPLETION_REPLY);
}

#[tokio::test]
async fn reply_without_choices_is_successful_fallback() {
    let parsed = parse_chat_completions_response(r#"{"model":"m","choices":[]}"#);
    let mock = MockLlm::new(vec![parsed]);
    let llm = as_dyn(&mock);

    let out = generate_response(Some(&llm), Uuid::new_v4(), "hi", "mitchell", &[]).await;

    assert!(out.response.success);
    assert_eq!(out.response.content, EMPTY_COMPLETION_REPLY);
    assert!(out.response.error.is_none());
}

#[tokio::test]
async fn model_text_is_returned_verbatim() {
    let mock = MockLlm::new(vec![Ok(text_response(Some("  Hi there.  ")))]);
    let llm = as_dyn(&mock);

    let out = generate_response(Some(&llm), Uuid::new_v4(), "hi", "mitchell", &[]).await;

    assert!(out.response.success);
    assert_eq!(out.response.content, "  Hi there.  ");
}

#[tokio::test]
async fn api_error_yields_failure_with_fallback_and_no_retry() {
    let mock = MockLlm::new(vec![Err(LlmError::ApiResponse { status: 500, body: "upstream".into() })]);
    let llm = as_dyn(&mock);

    let out = generate_response(Some(&llm), Uuid::new_v4(), "hi", "rodriguez", &[]).await;

    assert!(!out.response.success);
    assert_eq!(out.response.content, TECHNICAL_DIFFICULTIES_REPLY);
    assert!(out.response.error.as_deref().unwrap().contains("status 500"));
    assert_eq!(out.tokens_used, 0);
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test]
async fn missing_llm_yields_failure() {
    let out = generate_response(None, Uuid::new_v4(), "hi", "chen", &[]).await;
    assert!(!out.response.success);
    assert_eq!(out.response.content, TECHNICAL_DIFFICULTIES_REPLY);
    assert_eq!(out.response.error.as_deref(), Some("LLM not configured"));
}

#[tokio::test]
async fn request_carries_persona_history_and_params() {
    let mock = MockLlm::new(vec![]);
    let llm = as_dyn(&mock);
    let history = vec![Message::user("I did my wall sits"), Message::assistant("Nice work.")];

    let _ = generate_response(Some(&llm), Uuid::new_v4(), "they burned", "chen", &history).await;

    let calls = mock.calls();
    let (params, system, messages) = &calls[0];
    assert_eq!(params.max_tokens, DEFAULT_CHAT_MAX_TOKENS);
    assert!((params.temperature - 0.7).abs() < f32::EPSILON);
    assert!(system.contains("Dr. Marcus Chen"));
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].content, "I did my wall sits");
    assert_eq!(messages[2], Message { role: Role::User, content: "they burned".into() });
}

// =========================================================================
// helpers
// =========================================================================

#[test]
fn bounded_history_keeps_most_recent() {
    let history: Vec<Message> = (0..15).map(|i| Message::user(format!("m{i}"))).collect();
    let kept = bounded_history(&history, 10);
    assert_eq!(kept.len(), 10);
    assert_eq!(kept[0].content, "m5");
    assert_eq!(kept[9].content, "m14");

    assert_eq!(bounded_history(&history[..3], 10).len(), 3);
    assert!(bounded_history(&history, 0).is_empty());
}

#[test]
fn system_prompt_embeds_persona() {
    let doctor = doctor::find("mitchell").unwrap();
    let prompt = build_system_prompt(doctor);
    assert!(prompt.starts_with(
        "You are Dr. Sarah Mitchell, a Sports Physiotherapist with 12 years of experience in sports rehabilitation and ACL recovery."
    ));
    assert!(prompt.contains("Your personality: Encouraging, detail-oriented"));
    assert!(prompt.contains("If there's pain, recommend stopping"));
    assert!(prompt.contains("LENGTH: 1-2 short paragraphs max."));
}
