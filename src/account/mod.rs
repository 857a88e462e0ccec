/// Account management
///
/// Handles user registration, authentication, sessions, and profile updates.

mod service;
mod store;

pub use service::AuthService;
pub use store::{NewUser, UserStore};

use crate::db::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request. Media references arrive already resolved; upload
/// plumbing is an external collaborator.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    #[serde(rename = "coverImage")]
    pub cover_image_url: Option<String>,
}

/// Login request: either username or email identifies the account
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Token refresh request (token may also arrive via cookie)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Password change request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Partial profile update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// Avatar replacement (reference already resolved by the upload collaborator)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

/// Cover image replacement
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoverRequest {
    pub cover_image: String,
}

/// Sanitized account view: the only user shape that crosses the trust
/// boundary. Structurally cannot carry the password hash or refresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    #[serde(rename = "coverImage")]
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Freshly issued access/refresh pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login response: sanitized account plus both tokens
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}
