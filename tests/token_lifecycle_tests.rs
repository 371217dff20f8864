//! 令牌生命周期集成测试
//!
//! 凭证校验 → 签发 → 解析 → 账户状态校验

use chrono::{Duration, TimeZone, Utc};
use inventory_auth::{
    auth::{authorize_active, ClaimSet},
    error::AppError,
    repository::UserStore,
};
use serde_json::json;

mod common;
use common::{create_test_app_state, PASSWORD};

#[tokio::test]
async fn test_authenticate_returns_matching_user() {
    let (state, _store) = create_test_app_state().await;

    for username in ["alice", "bob", "carol"] {
        let user = state.auth_service.authenticate(username, PASSWORD).await.unwrap();
        assert_eq!(user.username, username);
    }
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let (state, _store) = create_test_app_state().await;

    let wrong_password = state.auth_service.authenticate("bob", "wrongpass").await.unwrap_err();
    let unknown_user = state.auth_service.authenticate("ghost", "anything").await.unwrap_err();

    assert!(matches!(wrong_password, AppError::NotAuthenticated));
    assert!(matches!(unknown_user, AppError::NotAuthenticated));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert_eq!(wrong_password.user_message(), unknown_user.user_message());
}

#[tokio::test]
async fn test_issue_then_resolve_round_trip() {
    let (state, store) = create_test_app_state().await;
    let alice = store.get_user("alice").await.unwrap().unwrap();

    let token = state.auth_service.issue_access_token(&alice).unwrap();
    let resolved = state.auth_service.resolve(&token.access_token).await.unwrap();

    assert_eq!(resolved, alice);
}

#[tokio::test]
async fn test_alice_fifteen_minute_window() {
    let (state, store) = create_test_app_state().await;
    let alice = store.get_user("alice").await.unwrap().unwrap();
    let tokens = state.auth_service.tokens();

    let t = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
    let token = tokens
        .issue_at(&ClaimSet::for_subject("alice"), Some(Duration::minutes(15)), t)
        .unwrap();

    let inside = t + Duration::minutes(14) + Duration::seconds(59);
    assert_eq!(state.auth_service.resolve_at(&token, inside).await.unwrap(), alice);

    let outside = t + Duration::minutes(15) + Duration::seconds(1);
    assert!(matches!(
        state.auth_service.resolve_at(&token, outside).await,
        Err(AppError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_zero_ttl_token_rejected() {
    let (state, _store) = create_test_app_state().await;
    let tokens = state.auth_service.tokens();

    let token = tokens
        .issue(&ClaimSet::for_subject("alice"), Some(Duration::zero()))
        .unwrap();

    assert!(matches!(state.auth_service.resolve(&token).await, Err(AppError::InvalidToken)));

    let past = tokens
        .issue(&ClaimSet::for_subject("alice"), Some(Duration::hours(-1)))
        .unwrap();
    assert!(matches!(state.auth_service.resolve(&past).await, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn test_extra_claims_resolve_to_subject() {
    let (state, store) = create_test_app_state().await;
    let alice = store.get_user("alice").await.unwrap().unwrap();

    let mut claims = ClaimSet::for_subject("alice");
    claims.insert("aud", json!("inventory"));
    claims.insert("iss", json!("inventory-backend"));
    claims.insert("nbf", json!(Utc::now().timestamp()));
    claims.insert("scope", json!(["items:read", "items:write"]));

    let token = state.auth_service.tokens().issue(&claims, None).unwrap();
    assert_eq!(state.auth_service.resolve(&token).await.unwrap(), alice);
    assert_eq!(state.auth_service.resolve_active(&token).await.unwrap(), alice);
}

#[tokio::test]
async fn test_extreme_ttl_is_an_error_not_a_crash() {
    let (state, _store) = create_test_app_state().await;
    let tokens = state.auth_service.tokens();

    for ttl in [Duration::MAX, Duration::MIN] {
        let result = tokens.issue(&ClaimSet::for_subject("alice"), Some(ttl));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    // 超长但可表示的有效期仍可正常解析
    let token = tokens
        .issue(&ClaimSet::for_subject("alice"), Some(Duration::days(365 * 50)))
        .unwrap();
    assert_eq!(state.auth_service.resolve(&token).await.unwrap().username, "alice");
}

#[tokio::test]
async fn test_tampering_any_byte_is_rejected() {
    let (state, _store) = create_test_app_state().await;
    let token = state.auth_service.tokens().issue_for_subject("alice", None).unwrap();
    assert!(state.auth_service.resolve(&token).await.is_ok());

    let bytes = token.as_bytes();
    for i in 0..bytes.len() {
        let mut tampered = bytes.to_vec();
        tampered[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        let result = state.auth_service.resolve(&tampered).await;
        assert!(
            matches!(result, Err(AppError::InvalidToken)),
            "tampered byte {} was accepted",
            i
        );
    }
}

#[tokio::test]
async fn test_deleted_subject_is_invalid_token() {
    let (state, store) = create_test_app_state().await;
    let token = state.auth_service.tokens().issue_for_subject("bob", None).unwrap();
    assert!(state.auth_service.resolve(&token).await.is_ok());

    assert!(store.delete_user("bob").await.unwrap());

    assert!(matches!(state.auth_service.resolve(&token).await, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn test_token_for_never_existing_subject_is_invalid() {
    let (state, _store) = create_test_app_state().await;
    let token = state.auth_service.tokens().issue_for_subject("ghost", None).unwrap();

    assert!(matches!(state.auth_service.resolve(&token).await, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn test_access_gate() {
    let (state, store) = create_test_app_state().await;

    let bob = store.get_user("bob").await.unwrap().unwrap();
    assert_eq!(authorize_active(bob.clone()).unwrap(), bob);

    // 刚签发的令牌也不能绕过禁用状态
    let token = state.auth_service.tokens().issue_for_subject("carol", None).unwrap();
    let carol = state.auth_service.resolve(&token).await.unwrap();
    assert!(carol.disabled);
    assert!(matches!(authorize_active(carol), Err(AppError::InactiveAccount)));
    assert!(matches!(
        state.auth_service.resolve_active(&token).await,
        Err(AppError::InactiveAccount)
    ));

    // 启用后同一令牌恢复可用
    assert!(store.set_disabled("carol", false).await);
    assert_eq!(
        state.auth_service.resolve_active(&token).await.unwrap().username,
        "carol"
    );
}

#[tokio::test]
async fn test_concurrent_resolution() {
    let (state, _store) = create_test_app_state().await;

    let mut handles = Vec::new();
    for i in 0..32 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let username = if i % 2 == 0 { "alice" } else { "bob" };
            let token = state.auth_service.tokens().issue_for_subject(username, None).unwrap();
            let user = state.auth_service.resolve(&token).await.unwrap();
            assert_eq!(user.username, username);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
