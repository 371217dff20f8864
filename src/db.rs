//! 数据库连接与迁移
//! 仅在配置了 INV_DATABASE__URL 时使用；用户表结构见 migrations/

use crate::{config::DatabaseConfig, error::AppError};
use secrecy::ExposeSecret;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time::Duration;

/// 连接时上报给 PostgreSQL 的应用名（pg_stat_activity 中可见）
const APPLICATION_NAME: &str = "inventory-auth";

/// 数据库错误类型
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database URL not configured")]
    NotConfigured,

    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotConfigured | DbError::InvalidUrl(_) => AppError::Config(e.to_string()),
            DbError::ConnectionFailed(_) | DbError::MigrationFailed(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

/// 解析连接 URL；URL 本身不写入日志
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DbError> {
    let url = config.url.as_ref().ok_or(DbError::NotConfigured)?;

    url.expose_secret()
        .parse::<PgConnectOptions>()
        .map(|options| options.application_name(APPLICATION_NAME))
        .map_err(|e| DbError::InvalidUrl(e.to_string()))
}

/// 创建连接池，获取连接前先做存活检查
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let options = connect_options(config)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect_with(options)
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connected to PostgreSQL"
    );

    Ok(pool)
}

/// 应用 migrations/ 下尚未执行的迁移
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationFailed(e.to_string()))?;

    tracing::info!("Database schema is up to date");
    Ok(())
}

/// 执行一次往返查询；失败时返回错误描述
pub async fn ping(pool: &PgPool) -> Result<(), String> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            tracing::warn!(error = %e, "Database ping failed");
            e.to_string()
        })
}

/// 上报连接池使用情况
pub fn record_pool_metrics(pool: &PgPool) {
    let idle = pool.num_idle();
    let in_use = (pool.size() as usize).saturating_sub(idle);

    metrics::gauge!("db_pool_connections", "state" => "idle").set(idle as f64);
    metrics::gauge!("db_pool_connections", "state" => "in_use").set(in_use as f64);
}
