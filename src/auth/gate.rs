//! Account-status gate applied after a token has been resolved

use crate::{error::AppError, models::user::User};

/// Pass an active user through unchanged, reject a disabled one
pub fn authorize_active(user: User) -> Result<User, AppError> {
    if user.disabled {
        tracing::debug!(username = %user.username, "Rejected disabled account");
        return Err(AppError::InactiveAccount);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(disabled: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "carol".to_string(),
            email: None,
            full_name: Some("Carol".to_string()),
            password_hash: "hash".to_string(),
            disabled,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_user_passes_unchanged() {
        let active = user(false);
        assert_eq!(authorize_active(active.clone()).unwrap(), active);
    }

    #[test]
    fn test_disabled_user_rejected() {
        assert!(matches!(authorize_active(user(true)), Err(AppError::InactiveAccount)));
    }
}
