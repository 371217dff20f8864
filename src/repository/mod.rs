//! User storage layer
//!
//! `UserStore` is the single lookup interface the authentication flow reads
//! from. Production uses PostgreSQL; tests and database-less deployments use
//! the in-memory store.

pub mod memory;
pub mod user_repo;

pub use memory::InMemoryUserStore;
pub use user_repo::PgUserStore;

use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// 根据用户名查找用户
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError>;

    /// 根据邮箱查找用户
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// 创建用户，密码由存储层哈希
    async fn add_user(&self, new_user: NewUser, password: &str) -> Result<User, AppError>;

    /// 删除用户
    async fn delete_user(&self, username: &str) -> Result<bool, AppError>;
}

/// 在阻塞线程池中计算密码哈希（Argon2 是 CPU 密集型）
pub(crate) async fn hash_blocking(hasher: &PasswordHasher, password: &str) -> Result<String, AppError> {
    let hasher = hasher.clone();
    let password = password.to_string();

    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}
