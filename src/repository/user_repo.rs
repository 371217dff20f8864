//! User repository (数据库访问层)

use super::{hash_blocking, UserStore};
use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL 用户存储
pub struct PgUserStore {
    db: PgPool,
    hasher: PasswordHasher,
}

impl PgUserStore {
    pub fn new(db: PgPool, hasher: PasswordHasher) -> Self {
        Self { db, hasher }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, disabled, created_at
            FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, disabled, created_at
            FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn add_user(&self, new_user: NewUser, password: &str) -> Result<User, AppError> {
        let password_hash = hash_blocking(&self.hasher, password).await?;

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, full_name, password_hash, disabled)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, full_name, password_hash, disabled, created_at
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&password_hash)
        .bind(new_user.disabled)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(format!("User {} already exists", new_user.username))
            }
            other => AppError::Database(other),
        })
    }

    async fn delete_user(&self, username: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
