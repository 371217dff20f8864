//! 用户相关的 HTTP 处理器

use crate::{
    auth::middleware::CurrentUser,
    models::{auth::WelcomeResponse, user::UserResponse},
};
use axum::Json;

/// 获取当前用户信息
pub async fn read_users_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// 受保护路由示例
pub async fn protected_route(CurrentUser(user): CurrentUser) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome to this protected route, {}", user.display_name()),
    })
}
