//! 认证相关的 HTTP 处理器

use crate::{error::AppError, middleware::AppState, models::auth::*};
use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use std::sync::Arc;

/// 用户名密码换取访问令牌
pub async fn login_for_access_token(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    // 表单缺字段或格式错误时返回统一的 JSON 错误体
    let Form(req) = form.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let (_user, issued) = state
        .auth_service
        .login(&req.username, &req.password)
        .await?;

    Ok(Json(TokenResponse::bearer(issued.access_token, issued.expires_in)))
}
