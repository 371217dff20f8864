//! 应用装配
//! 根据配置创建用户存储、令牌服务和认证服务

use crate::{
    auth::{password::PasswordHasher, token::TokenService},
    config::AppConfig,
    db,
    error::AppError,
    middleware::AppState,
    models::user::NewUser,
    repository::{InMemoryUserStore, PgUserStore, UserStore},
    services::AuthService,
};
use chrono::Duration;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;

/// 按配置构建应用状态：配置了数据库则使用 PostgreSQL，否则使用内存存储
pub async fn build_state(config: AppConfig) -> Result<Arc<AppState>, AppError> {
    let hasher = PasswordHasher::from_config(&config.security)?;

    let (store, pool): (Arc<dyn UserStore>, Option<PgPool>) = if config.database.url.is_some() {
        let pool = db::create_pool(&config.database).await?;
        db::run_migrations(&pool).await?;
        tracing::info!("Using PostgreSQL user store");
        (Arc::new(PgUserStore::new(pool.clone(), hasher.clone())), Some(pool))
    } else {
        tracing::warn!("No database configured, using in-memory user store");
        (Arc::new(InMemoryUserStore::new(hasher.clone())), None)
    };

    build_state_with_store(config, store, pool).await
}

/// 使用给定的用户存储构建应用状态
pub async fn build_state_with_store(
    config: AppConfig,
    store: Arc<dyn UserStore>,
    db: Option<PgPool>,
) -> Result<Arc<AppState>, AppError> {
    let hasher = PasswordHasher::from_config(&config.security)?;
    let tokens = Arc::new(TokenService::from_config(&config)?);

    bootstrap_user(&config, store.as_ref()).await?;

    let auth_service = Arc::new(AuthService::new(
        store,
        tokens,
        hasher,
        Duration::seconds(config.security.access_token_exp_secs as i64),
    )?);

    Ok(Arc::new(AppState {
        config,
        db,
        auth_service,
    }))
}

/// 创建配置中的初始账户（已存在则跳过）
async fn bootstrap_user(config: &AppConfig, store: &dyn UserStore) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (
        config.security.bootstrap_username.as_deref(),
        config.security.bootstrap_password.as_ref(),
    ) else {
        return Ok(());
    };

    if store.get_user(username).await?.is_some() {
        tracing::debug!(%username, "Bootstrap user already present");
        return Ok(());
    }

    store
        .add_user(NewUser::new(username), password.expose_secret())
        .await?;

    tracing::info!(%username, "Bootstrap user created");
    Ok(())
}
