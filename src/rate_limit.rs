//! In-memory rate limiting for doctor chat requests.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<Uuid, VecDeque<Instant>>`.
//! Three limits enforced, all keyed by authenticated user:
//! - Per-user: 10 chat requests/min
//! - Global: 30 completion calls/min
//! - Token budget: 50k tokens/user/hour
//!
//! Counters live only in process memory and reset on restart.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

const DEFAULT_PER_USER_LIMIT: usize = 10;
const DEFAULT_PER_USER_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 30;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

const DEFAULT_TOKEN_BUDGET: u64 = 50_000;
const DEFAULT_TOKEN_WINDOW_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimitConfig {
    pub(crate) per_user_limit: usize,
    pub(crate) per_user_window: Duration,
    pub(crate) global_limit: usize,
    pub(crate) global_window: Duration,
    pub(crate) token_budget: u64,
    pub(crate) token_window: Duration,
}

impl RateLimitConfig {
    fn from_env() -> Self {
        Self {
            per_user_limit: env_parse("RATE_LIMIT_PER_USER", DEFAULT_PER_USER_LIMIT),
            per_user_window: Duration::from_secs(env_parse(
                "RATE_LIMIT_PER_USER_WINDOW_SECS",
                DEFAULT_PER_USER_WINDOW_SECS,
            )),
            global_limit: env_parse("RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(env_parse("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS)),
            token_budget: env_parse("RATE_LIMIT_TOKEN_BUDGET", DEFAULT_TOKEN_BUDGET),
            token_window: Duration::from_secs(env_parse("RATE_LIMIT_TOKEN_WINDOW_SECS", DEFAULT_TOKEN_WINDOW_SECS)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_user_limit: DEFAULT_PER_USER_LIMIT,
            per_user_window: Duration::from_secs(DEFAULT_PER_USER_WINDOW_SECS),
            global_limit: DEFAULT_GLOBAL_LIMIT,
            global_window: Duration::from_secs(DEFAULT_GLOBAL_WINDOW_SECS),
            token_budget: DEFAULT_TOKEN_BUDGET,
            token_window: Duration::from_secs(DEFAULT_TOKEN_WINDOW_SECS),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RateLimitError {
    #[error("per-user rate limit exceeded (max {limit} requests/{window_secs}s)")]
    PerUserExceeded { limit: usize, window_secs: u64 },
    #[error("global rate limit exceeded (max {limit} requests/{window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
    #[error("token budget exceeded (max {budget} tokens/{window_secs}s)")]
    TokenBudgetExceeded { budget: u64, window_secs: u64 },
}

impl crate::error::ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PerUserExceeded { .. } => "E_RATE_LIMIT_USER",
            Self::GlobalExceeded { .. } => "E_RATE_LIMIT_GLOBAL",
            Self::TokenBudgetExceeded { .. } => "E_TOKEN_BUDGET",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

#[derive(Default)]
struct RateLimiterInner {
    /// Per-user request timestamps.
    user_requests: HashMap<Uuid, VecDeque<Instant>>,
    /// Global request timestamps.
    global_requests: VecDeque<Instant>,
    /// Per-user token usage: (timestamp, `token_count`).
    user_tokens: HashMap<Uuid, VecDeque<(Instant, u64)>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::from_env())
    }

    pub(crate) fn with_config(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(RateLimiterInner::default())), config }
    }

    /// Check the token budget, then both request limits, then record the request.
    ///
    /// # Errors
    ///
    /// Returns the first limit that would be exceeded. Nothing is recorded on error.
    pub fn check_and_record(&self, user_id: Uuid) -> Result<(), RateLimitError> {
        self.check_and_record_at(user_id, Instant::now())
    }

    fn check_and_record_at(&self, user_id: Uuid, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        let used_tokens: u64 = {
            let tokens = inner.user_tokens.entry(user_id).or_default();
            prune(tokens, now, cfg.token_window, |&(at, _)| at);
            tokens.iter().map(|(_, t)| t).sum()
        };
        if used_tokens >= cfg.token_budget {
            return Err(RateLimitError::TokenBudgetExceeded {
                budget: cfg.token_budget,
                window_secs: cfg.token_window.as_secs(),
            });
        }

        prune(&mut inner.global_requests, now, cfg.global_window, |&at| at);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let user_deque = inner.user_requests.entry(user_id).or_default();
        prune(user_deque, now, cfg.per_user_window, |&at| at);
        if user_deque.len() >= cfg.per_user_limit {
            return Err(RateLimitError::PerUserExceeded {
                limit: cfg.per_user_limit,
                window_secs: cfg.per_user_window.as_secs(),
            });
        }

        user_deque.push_back(now);
        inner.global_requests.push_back(now);
        Ok(())
    }

    /// Record token usage after a completion response.
    pub fn record_tokens(&self, user_id: Uuid, tokens: u64) {
        self.record_tokens_at(user_id, tokens, Instant::now());
    }

    fn record_tokens_at(&self, user_id: Uuid, tokens: u64, now: Instant) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let window = self.config.token_window;
        let deque = inner.user_tokens.entry(user_id).or_default();
        prune(deque, now, window, |&(at, _)| at);
        deque.push_back((now, tokens));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Drop entries older than `window` from the front of a time-ordered deque.
fn prune<T>(deque: &mut VecDeque<T>, now: Instant, window: Duration, stamp: impl Fn(&T) -> Instant) {
    while deque.front().is_some_and(|e| now.duration_since(stamp(e)) > window) {
        deque.pop_front();
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
