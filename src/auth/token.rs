//! Signed bearer tokens: issuance and validation.
//!
//! A token is a compact HMAC-signed JWT carrying a free-form claim set. Two
//! claims are reserved: `sub` (the username) and `exp` (expiry as Unix
//! seconds). Validation is a single check over signature, expiry and subject;
//! a token either yields its subject or a [`ValidationError`].

use crate::{config::AppConfig, error::AppError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Claim key holding the subject (username)
pub const SUBJECT_CLAIM: &str = "sub";

/// Claim key holding the expiry timestamp
pub const EXPIRY_CLAIM: &str = "exp";

/// Lifetime in seconds used when the caller does not supply one
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Claims carried by a token, keyed by claim name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Claim set with only the subject populated
    pub fn for_subject(subject: impl Into<String>) -> Self {
        let mut claims = Self::new();
        claims.insert(SUBJECT_CLAIM, Value::String(subject.into()));
        claims
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get(SUBJECT_CLAIM).and_then(Value::as_str)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.get(EXPIRY_CLAIM)
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Why a presented token was refused
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token carries no subject")]
    MissingSubject,
}

/// Token issuer and validator bound to one secret and algorithm
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenService {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
        }
    }

    /// Create token service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config.security.jwt_secret.expose_secret();

        // HMAC keys shorter than the digest weaken the signature
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let algorithm = config.security.algorithm()?;

        Ok(Self::new(secret.as_bytes(), algorithm))
    }

    /// Issue a token expiring `ttl` from now (15 minutes when `None`)
    pub fn issue(&self, claims: &ClaimSet, ttl: Option<Duration>) -> Result<String, AppError> {
        self.issue_at(claims, ttl, Utc::now())
    }

    /// Issue a token for a bare subject
    pub fn issue_for_subject(&self, subject: &str, ttl: Option<Duration>) -> Result<String, AppError> {
        self.issue(&ClaimSet::for_subject(subject), ttl)
    }

    /// Issue a token as of `now`. The caller's claims are copied, never modified.
    pub fn issue_at(
        &self,
        claims: &ClaimSet,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let ttl = ttl.unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_TTL_SECS));

        // `exp` is an unsigned NumericDate, so it must land on or after the epoch
        let expiration = now
            .checked_add_signed(ttl)
            .filter(|expiration| expiration.timestamp() >= 0)
            .ok_or_else(|| AppError::BadRequest("Token lifetime out of range".to_string()))?;

        let mut to_encode = claims.clone();
        to_encode.insert(EXPIRY_CLAIM, Value::from(expiration.timestamp()));

        encode(&Header::new(self.algorithm), &to_encode, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Decode a token and check its signature only
    fn decode_claims(&self, token: &str) -> Result<ClaimSet, ValidationError> {
        // Expiry is checked against the caller's clock below, not the system clock
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        // No audience is configured; an `aud` claim is carried, not checked
        validation.validate_aud = false;
        validation.set_required_spec_claims(&[EXPIRY_CLAIM]);

        decode::<ClaimSet>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    ValidationError::BadSignature
                }
                _ => ValidationError::Malformed,
            })
    }

    /// Validate a token as of `now` and return its subject
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<String, ValidationError> {
        let claims = self.decode_claims(token)?;

        let expires_at = claims.expires_at().ok_or(ValidationError::Malformed)?;
        if now >= expires_at {
            return Err(ValidationError::Expired);
        }

        match claims.subject() {
            Some(subject) if !subject.is_empty() => Ok(subject.to_string()),
            _ => Err(ValidationError::MissingSubject),
        }
    }
}
