/// User database records
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database
///
/// `password_hash` and `refresh_token` never cross the trust boundary;
/// responses are built from [`crate::account::UserView`] instead.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    /// The single currently-valid refresh token; NULL after logout
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directed subscription edge: subscriber follows channel
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

/// Watch history entry referencing an external media entity
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WatchHistoryEntry {
    pub user_id: String,
    pub video_ref: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}
