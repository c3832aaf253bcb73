//! LLM configuration parsed from environment variables.

use super::types::LlmError;
use crate::rate_limit::env_parse;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "qwen/qwen3-30b-a3b-instruct-2507";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Required:
    /// - `LLM_API_KEY_ENV` (names the env var containing the key, e.g. `OPENROUTER_API_KEY`)
    ///
    /// Optional:
    /// - `LLM_MODEL`: default `qwen/qwen3-30b-a3b-instruct-2507`
    /// - `LLM_BASE_URL`: any OpenAI-compatible base URL, default `OpenRouter`
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when the key variable is unset or
    /// empty, and [`LlmError::ConfigParse`] for a malformed base URL.
    pub fn from_env() -> Result<Self, LlmError> {
        let key_var =
            std::env::var("LLM_API_KEY_ENV").map_err(|_| LlmError::MissingApiKey { var: "LLM_API_KEY_ENV".into() })?;
        let api_key = std::env::var(&key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey { var: key_var.clone() })?;

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string());
        let base_url = parse_base_url(std::env::var("LLM_BASE_URL").ok().as_deref())?;
        let timeouts = LlmTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key, model, base_url, timeouts })
    }
}

fn parse_base_url(raw: Option<&str>) -> Result<String, LlmError> {
    let url = raw.unwrap_or(DEFAULT_LLM_BASE_URL).trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(LlmError::ConfigParse(format!("LLM_BASE_URL must be an http(s) URL, got '{url}'")))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
