use super::*;

fn limiter() -> RateLimiter {
    RateLimiter::with_config(RateLimitConfig::default())
}

#[test]
fn per_user_allows_up_to_limit() {
    let rl = limiter();
    let user = Uuid::new_v4();
    let now = Instant::now();

    for i in 0..DEFAULT_PER_USER_LIMIT {
        assert!(rl.check_and_record_at(user, now).is_ok(), "request {i} should succeed");
    }
    assert!(matches!(
        rl.check_and_record_at(user, now),
        Err(RateLimitError::PerUserExceeded { limit: DEFAULT_PER_USER_LIMIT, .. })
    ));
}

#[test]
fn global_allows_up_to_limit() {
    let rl = limiter();
    let now = Instant::now();

    for i in 0..DEFAULT_GLOBAL_LIMIT {
        assert!(rl.check_and_record_at(Uuid::new_v4(), now).is_ok(), "request {i} should succeed");
    }
    assert!(matches!(
        rl.check_and_record_at(Uuid::new_v4(), now),
        Err(RateLimitError::GlobalExceeded { .. })
    ));
}

#[test]
fn rejected_request_is_not_recorded() {
    let rl = RateLimiter::with_config(RateLimitConfig { per_user_limit: 1, ..RateLimitConfig::default() });
    let user = Uuid::new_v4();
    let now = Instant::now();

    rl.check_and_record_at(user, now).unwrap();
    assert!(rl.check_and_record_at(user, now).is_err());
    // Only the first request counts toward the global window.
    let inner = rl.inner.lock().unwrap();
    assert_eq!(inner.global_requests.len(), 1);
}

#[test]
fn token_budget_exceeded() {
    let rl = limiter();
    let user = Uuid::new_v4();
    let now = Instant::now();

    rl.record_tokens_at(user, DEFAULT_TOKEN_BUDGET, now);

    assert!(matches!(
        rl.check_and_record_at(user, now),
        Err(RateLimitError::TokenBudgetExceeded { budget: DEFAULT_TOKEN_BUDGET, .. })
    ));
}

#[test]
fn token_budget_is_per_user() {
    let rl = limiter();
    let now = Instant::now();

    rl.record_tokens_at(Uuid::new_v4(), DEFAULT_TOKEN_BUDGET, now);
    assert!(rl.check_and_record_at(Uuid::new_v4(), now).is_ok());
}

#[test]
fn window_expiry_allows_new_requests() {
    let rl = limiter();
    let user = Uuid::new_v4();
    let start = Instant::now();

    for _ in 0..DEFAULT_PER_USER_LIMIT {
        rl.check_and_record_at(user, start).unwrap();
    }
    assert!(rl.check_and_record_at(user, start).is_err());

    let later = start + Duration::from_secs(DEFAULT_PER_USER_WINDOW_SECS + 1);
    assert!(rl.check_and_record_at(user, later).is_ok());
}

#[test]
fn rate_limit_errors_are_retryable() {
    use crate::error::ErrorCode;
    let err = RateLimitError::GlobalExceeded { limit: 1, window_secs: 60 };
    assert!(err.retryable());
    assert_eq!(err.error_code(), "E_RATE_LIMIT_GLOBAL");
}
