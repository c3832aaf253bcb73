use super::*;
use crate::error::ErrorCode;

#[test]
fn error_codes_are_distinct_per_variant() {
    let errs = [
        LlmError::ConfigParse("bad".into()),
        LlmError::MissingApiKey { var: "KEY".into() },
        LlmError::ApiRequest("timeout".into()),
        LlmError::ApiResponse { status: 500, body: "oops".into() },
        LlmError::ApiParse("json".into()),
        LlmError::HttpClientBuild("tls".into()),
    ];
    let codes: Vec<&str> = errs.iter().map(ErrorCode::error_code).collect();
    assert_eq!(
        codes,
        [
            "E_CONFIG_PARSE",
            "E_MISSING_API_KEY",
            "E_API_REQUEST",
            "E_API_RESPONSE",
            "E_API_PARSE",
            "E_HTTP_CLIENT_BUILD"
        ]
    );
}

#[test]
fn retryable_on_transport_and_server_errors() {
    assert!(LlmError::ApiRequest("conn refused".into()).retryable());
    assert!(LlmError::ApiResponse { status: 429, body: String::new() }.retryable());
    assert!(LlmError::ApiResponse { status: 503, body: String::new() }.retryable());
}

#[test]
fn not_retryable_on_client_errors() {
    assert!(!LlmError::ApiResponse { status: 401, body: "bad key".into() }.retryable());
    assert!(!LlmError::ApiParse("eof".into()).retryable());
    assert!(!LlmError::MissingApiKey { var: "X".into() }.retryable());
}

#[test]
fn api_response_display_includes_status_and_body() {
    let err = LlmError::ApiResponse { status: 402, body: "insufficient credits".into() };
    assert_eq!(err.to_string(), "API response error: status 402 insufficient credits");
}

#[test]
fn role_serializes_lowercase() {
    let msg = Message::assistant("hi");
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "hi" }));
    assert_eq!(Role::System.as_str(), "system");
}

#[test]
fn role_rejects_unknown_values() {
    let parsed = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
    assert!(parsed.is_err());
}
