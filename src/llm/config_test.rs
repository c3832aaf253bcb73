use super::*;
use std::sync::Mutex;

/// Serializes tests in this module; they mutate process-wide env vars.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// # Safety
/// Callers hold `ENV_LOCK` so no other test reads the env concurrently.
unsafe fn clear_llm_env() {
    unsafe {
        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("LLM_API_KEY_ENV");
        std::env::remove_var("LLM_BASE_URL");
        std::env::remove_var("LLM_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("LLM_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("REHAB_TEST_LLM_KEY");
    }
}

#[test]
fn from_env_defaults_to_openrouter() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "REHAB_TEST_LLM_KEY");
        std::env::set_var("REHAB_TEST_LLM_KEY", "secret");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.model, DEFAULT_LLM_MODEL);
    assert_eq!(cfg.base_url, DEFAULT_LLM_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.api_key, "secret");

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "REHAB_TEST_LLM_KEY");
        std::env::set_var("REHAB_TEST_LLM_KEY", "sk-test");
        std::env::set_var("LLM_MODEL", "gpt-4o-mini");
        std::env::set_var("LLM_BASE_URL", "https://example.test/v1/");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "7");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_missing_key_var_errors() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_llm_env() };

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "LLM_API_KEY_ENV"));
}

#[test]
fn from_env_empty_key_errors() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "REHAB_TEST_LLM_KEY");
        std::env::set_var("REHAB_TEST_LLM_KEY", "  ");
    }

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "REHAB_TEST_LLM_KEY"));

    unsafe { clear_llm_env() };
}

#[test]
fn parse_base_url_rejects_non_http() {
    let err = parse_base_url(Some("openrouter.ai/api/v1")).unwrap_err().to_string();
    assert!(err.contains("LLM_BASE_URL"));
}
