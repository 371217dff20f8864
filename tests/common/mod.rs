//! 测试公共模块
//! 提供测试配置、内存用户存储和请求辅助函数

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use inventory_auth::{
    app,
    auth::password::PasswordHasher,
    config::{AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig},
    middleware::AppState,
    models::user::NewUser,
    repository::{InMemoryUserStore, UserStore},
    routes,
};
use secrecy::Secret;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret";

/// 创建测试配置（低成本 Argon2 参数）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new("test-secret-key-for-testing-only-min-32-chars".to_string()),
            jwt_algorithm: "HS256".to_string(),
            access_token_exp_secs: 900,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            bootstrap_username: None,
            bootstrap_password: None,
        },
    }
}

pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::with_params(1024, 1, 1).expect("valid test params")
}

/// 创建内存用户存储并写入测试用户：alice、bob（启用），carol（禁用）
pub async fn seeded_store() -> Arc<InMemoryUserStore> {
    let store = Arc::new(InMemoryUserStore::new(test_hasher()));

    store
        .add_user(
            NewUser::new("alice")
                .with_email("alice@example.com")
                .with_full_name("Alice Wonderson"),
            PASSWORD,
        )
        .await
        .expect("Failed to create alice");
    store
        .add_user(NewUser::new("bob").with_full_name("Bob Builder"), PASSWORD)
        .await
        .expect("Failed to create bob");
    store
        .add_user(
            NewUser::new("carol").with_full_name("Carol Chains").disabled(),
            PASSWORD,
        )
        .await
        .expect("Failed to create carol");

    store
}

/// 创建测试应用状态，同时返回底层存储以便修改用户
pub async fn create_test_app_state() -> (Arc<AppState>, Arc<InMemoryUserStore>) {
    let store = seeded_store().await;
    let state = app::build_state_with_store(create_test_config(), store.clone(), None)
        .await
        .expect("Failed to build app state");

    (state, store)
}

pub async fn create_test_app() -> (Router, Arc<AppState>, Arc<InMemoryUserStore>) {
    let (state, store) = create_test_app_state().await;
    (routes::create_router(state.clone()), state, store)
}

/// 发送登录表单
pub async fn post_login(app: &Router, username: &str, password: &str) -> Response<Body> {
    post_login_form(
        app,
        "application/x-www-form-urlencoded",
        &format!("username={}&password={}", username, password),
    )
    .await
}

/// 以任意 Content-Type 和原始表单体请求登录
pub async fn post_login_form(app: &Router, content_type: &str, body: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/token")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// 携带 Bearer 令牌发送 GET 请求
pub async fn get_with_token(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
