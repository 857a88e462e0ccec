/// JWT token service
///
/// Issues and verifies the access/refresh token pair. The two token types are
/// signed with independent secrets so a leaked token of one type can never
/// verify as the other. Verification failures stay distinguishable here
/// ([`TokenError`]); callers collapse them into a single unauthorized outcome
/// before anything crosses the trust boundary.
use crate::{config::AuthConfig, db::user::User};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Internal token verification failures. Distinguishable for tests and
/// logging; never surfaced verbatim to clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
    #[error("token encoding failed: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Access token claims: enough identity to serve a request without a lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token claims: identity plus a per-issue id. Timestamps are
/// second-resolution, so without `jti` two tokens issued in the same second
/// would be byte-identical and rotation could swap a token for its equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies both token types
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from the authentication configuration
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; lifetimes are already minutes-scale
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
            validation,
        }
    }

    /// Issue a short-lived access token for an account
    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Issue a long-lived refresh token for an account. Every token is
    /// unique, even for the same account in the same second.
    pub fn issue_refresh(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user.id.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify an access token and return its claims
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Verify a refresh token and return its claims
    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)?;
        Ok(data.claims)
    }
}
