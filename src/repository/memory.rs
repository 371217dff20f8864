//! In-memory user store (内存存储，用于测试和无数据库部署)

use super::{hash_blocking, UserStore};
use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 以用户名为键的内存用户存储
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
    hasher: PasswordHasher,
}

impl InMemoryUserStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            hasher,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// 设置禁用状态；用户不存在时返回 false
    pub async fn set_disabled(&self, username: &str, disabled: bool) -> bool {
        match self.users.write().await.get_mut(username) {
            Some(user) => {
                user.disabled = disabled;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn add_user(&self, new_user: NewUser, password: &str) -> Result<User, AppError> {
        let password_hash = hash_blocking(&self.hasher, password).await?;

        let mut users = self.users.write().await;
        if users.contains_key(&new_user.username) {
            return Err(AppError::Conflict(format!(
                "User {} already exists",
                new_user.username
            )));
        }
        if let Some(email) = new_user.email.as_deref() {
            if users.values().any(|u| u.email.as_deref() == Some(email)) {
                return Err(AppError::Conflict(format!("Email {} already in use", email)));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            password_hash,
            disabled: new_user.disabled,
            created_at: Utc::now(),
        };
        users.insert(user.username.clone(), user.clone());

        tracing::debug!(username = %user.username, "User added");
        Ok(user)
    }

    async fn delete_user(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.users.write().await.remove(username).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryUserStore {
        InMemoryUserStore::new(PasswordHasher::with_params(1024, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn test_add_and_get_user() {
        let store = store();
        let user = store
            .add_user(
                NewUser::new("maria")
                    .with_email("maria@example.com")
                    .with_full_name("Maria Margarida"),
                "password",
            )
            .await
            .unwrap();

        assert_ne!(user.password_hash, "password");
        assert!(!user.disabled);

        let found = store.get_user("maria").await.unwrap().unwrap();
        assert_eq!(found, user);

        let by_email = store.get_user_by_email("maria@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.username, "maria");

        assert!(store.get_user("ghost").await.unwrap().is_none());
        assert!(store.get_user_by_email("ghost@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = store();
        store.add_user(NewUser::new("maria"), "password").await.unwrap();

        let result = store.add_user(NewUser::new("maria"), "other").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = store();
        store
            .add_user(NewUser::new("maria").with_email("m@example.com"), "password")
            .await
            .unwrap();

        let result = store
            .add_user(NewUser::new("mario").with_email("m@example.com"), "password")
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_and_disable() {
        let store = store();
        store.add_user(NewUser::new("maria"), "password").await.unwrap();

        assert!(store.set_disabled("maria", true).await);
        assert!(store.get_user("maria").await.unwrap().unwrap().disabled);
        assert!(!store.set_disabled("ghost", true).await);

        assert!(store.delete_user("maria").await.unwrap());
        assert!(!store.delete_user("maria").await.unwrap());
        assert!(store.is_empty().await);
    }
}
