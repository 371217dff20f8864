//! 认证服务：凭证校验、令牌签发、令牌解析

use crate::{
    auth::{
        gate::authorize_active,
        password::PasswordHasher,
        token::{ClaimSet, TokenService},
    },
    error::AppError,
    models::user::User,
    repository::UserStore,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// 签发结果：访问令牌及其有效期（秒）
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    access_token_ttl: Duration,
    // 用户不存在时也做一次哈希校验，避免响应时间暴露用户名是否存在
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
        access_token_ttl: Duration,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash("inventory-auth-dummy-password")?;

        Ok(Self {
            users,
            tokens,
            hasher,
            access_token_ttl,
            dummy_hash,
        })
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// 校验用户名和密码
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self.users.get_user(username).await?;

        let stored_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

        match user {
            Some(user) if verified => {
                tracing::debug!(username = %user.username, "Credentials verified");
                Ok(user)
            }
            _ => {
                tracing::debug!(%username, "Credential check failed");
                Err(AppError::NotAuthenticated)
            }
        }
    }

    /// 签发访问令牌
    pub fn issue_access_token(&self, user: &User) -> Result<IssuedToken, AppError> {
        let access_token = self
            .tokens
            .issue(&ClaimSet::for_subject(&user.username), Some(self.access_token_ttl))?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.access_token_ttl.num_seconds().max(0) as u64,
        })
    }

    /// 登录：校验凭证后签发令牌
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, IssuedToken), AppError> {
        let user = self.authenticate(username, password).await?;
        let token = self.issue_access_token(&user)?;

        tracing::info!(username = %user.username, "User logged in");
        Ok((user, token))
    }

    /// 解析令牌对应的用户
    pub async fn resolve(&self, token: &str) -> Result<User, AppError> {
        self.resolve_at(token, Utc::now()).await
    }

    /// 以指定时间点解析令牌；任何失败都折叠为 InvalidToken
    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<User, AppError> {
        let subject = self.tokens.validate(token, now).map_err(|e| {
            tracing::debug!(reason = %e, "Token rejected");
            AppError::InvalidToken
        })?;

        match self.users.get_user(&subject).await? {
            Some(user) => Ok(user),
            None => {
                tracing::debug!(%subject, "Token subject no longer exists");
                Err(AppError::InvalidToken)
            }
        }
    }

    /// 解析令牌并要求账户处于启用状态
    pub async fn resolve_active(&self, token: &str) -> Result<User, AppError> {
        authorize_active(self.resolve(token).await?)
    }
}
