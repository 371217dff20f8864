//! Authentication-related models

use serde::{Deserialize, Serialize};

/// Token request (form encoded, OAuth2 password flow)
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64, // seconds until the token expires
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

/// Protected route greeting
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}
