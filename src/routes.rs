//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{handlers, middleware::AppState};

/// 请求体上限（登录表单足够小）
const MAX_BODY_BYTES: usize = 16 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由（无需令牌）
    let auth_routes = Router::new().route("/auth/token", post(handlers::auth::login_for_access_token));

    // 需要令牌且账户启用的路由
    let authenticated_routes = Router::new()
        .route("/users/me", get(handlers::user::read_users_me))
        .route("/protected", get(handlers::user::protected_route))
        .layer(axum::middleware::from_fn_with_state(
            state.auth_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
