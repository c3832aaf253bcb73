use super::*;
use axum::http::Request;

use crate::state::test_helpers;

fn parts_with(headers: &[(&str, &str)]) -> Parts {
    let mut builder = Request::builder().uri("/api/profile");
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(()).unwrap().into_parts().0
}

// =============================================================================
// env_bool — unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_and_false_variants() {
    for (i, (val, expected)) in [("1", true), ("YES", true), (" on ", true), ("0", false), ("False", false), ("off", false)]
        .iter()
        .enumerate()
    {
        let key = format!("__TEST_REHAB_EB_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(*expected), "for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_or_unset_is_none() {
    let key = "__TEST_REHAB_EB_INVALID__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__TEST_REHAB_EB_SURELY_UNSET__"), None);
}

// =============================================================================
// extractor
// =============================================================================

#[tokio::test]
async fn dev_header_accepted_when_bypass_enabled() {
    let state = test_helpers::test_app_state();
    let id = Uuid::new_v4();
    let mut parts = parts_with(&[(DEV_USER_HEADER, id.to_string().as_str())]);

    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth.user.id, id);
    assert!(auth.user.email.is_none());
}

#[tokio::test]
async fn dev_header_ignored_when_bypass_disabled() {
    let mut state = test_helpers::test_app_state();
    state.dev_bypass = false;
    let mut parts = parts_with(&[(DEV_USER_HEADER, Uuid::new_v4().to_string().as_str())]);

    let err = AuthUser::from_request_parts(&mut parts, &state).await.err().unwrap();
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    assert_eq!(err.body.code, "E_UNAUTHORIZED");
}

#[tokio::test]
async fn malformed_dev_header_falls_through_to_bearer() {
    let state = test_helpers::test_app_state();
    let mut parts = parts_with(&[(DEV_USER_HEADER, "not-a-uuid")]);

    let err = AuthUser::from_request_parts(&mut parts, &state).await.err().unwrap();
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_without_provider_is_unavailable() {
    let state = test_helpers::test_app_state();
    let mut parts = parts_with(&[("authorization", "Bearer abc.def.ghi")]);

    let err = AuthUser::from_request_parts(&mut parts, &state).await.err().unwrap();
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.body.code, "E_AUTH_NOT_CONFIGURED");
}

#[test]
fn auth_errors_map_to_statuses() {
    assert_eq!(auth_status(&AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_status(&AuthError::Upstream("timeout".into())), StatusCode::BAD_GATEWAY);
    assert_eq!(auth_status(&AuthError::Parse("bad".into())), StatusCode::BAD_GATEWAY);
}
