/// User repository backed by runtime sqlx queries
///
/// All mutation goes through single-row updates that are atomic at the field
/// level; nothing here spans multiple accounts in one write.
use crate::{
    db::user::{User, WatchHistoryEntry},
    error::{ApiError, ApiResult},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
                            cover_image_url, refresh_token, created_at, updated_at";

/// Fields for a new account; normalization and hashing happen in the service
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// Identity-keyed persistence for user records
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new account. Uniqueness of username and email is enforced
    /// here; a violation surfaces as a conflict.
    pub async fn create(&self, new_user: NewUser) -> ApiResult<User> {
        if self
            .username_or_email_exists(&new_user.username, &new_user.email)
            .await?
        {
            return Err(ApiError::Conflict(
                "User with the same username or email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            password_hash: new_user.password_hash,
            avatar_url: new_user.avatar_url,
            cover_image_url: new_user.cover_image_url,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, avatar_url, \
             cover_image_url, refresh_token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(&user.cover_image_url)
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(conflict_on_unique)?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = ?1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Find an account by username or email in one lookup
    pub async fn find_by_identifier(&self, identifier: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = ?1 OR email = ?1",
            USER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn username_or_email_exists(&self, username: &str, email: &str) -> ApiResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2")
                .bind(username)
                .bind(email)
                .fetch_one(&self.db)
                .await?;

        Ok(count > 0)
    }

    /// Persist a freshly issued refresh token as the account's current one
    pub async fn set_refresh_token(&self, id: &str, token: &str) -> ApiResult<()> {
        sqlx::query("UPDATE users SET refresh_token = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(token)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Clear the current refresh token unconditionally (logout). Idempotent.
    pub async fn clear_refresh_token(&self, id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Compare-and-swap rotation of the refresh token. The WHERE clause makes
    /// the read-compare-write a single atomic statement, so of two concurrent
    /// refresh calls presenting the same token exactly one wins.
    pub async fn rotate_refresh_token(
        &self,
        id: &str,
        presented: &str,
        next: &str,
    ) -> ApiResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = ?3, updated_at = ?4 \
             WHERE id = ?1 AND refresh_token = ?2",
        )
        .bind(id)
        .bind(presented)
        .bind(next)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn update_password(&self, id: &str, password_hash: &str) -> ApiResult<()> {
        sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Update full name and/or email; absent fields keep their value
    pub async fn update_profile(
        &self,
        id: &str,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> ApiResult<User> {
        sqlx::query(
            "UPDATE users SET full_name = COALESCE(?2, full_name), \
             email = COALESCE(?3, email), updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(conflict_on_unique)?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn update_avatar(&self, id: &str, avatar_url: &str) -> ApiResult<User> {
        sqlx::query("UPDATE users SET avatar_url = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(avatar_url)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn update_cover_image(&self, id: &str, cover_url: &str) -> ApiResult<User> {
        sqlx::query("UPDATE users SET cover_image_url = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(cover_url)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn delete(&self, id: &str) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Ordered references to externally stored media entities
    pub async fn watch_history(&self, id: &str) -> ApiResult<Vec<WatchHistoryEntry>> {
        let entries = sqlx::query_as::<_, WatchHistoryEntry>(
            "SELECT user_id, video_ref, position, created_at \
             FROM watch_history WHERE user_id = ?1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}

/// Translate a SQLite unique-constraint failure into a conflict
fn conflict_on_unique(e: sqlx::Error) -> ApiError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::Conflict(
            "User with the same username or email already exists".to_string(),
        ),
        _ => ApiError::Database(e),
    }
}
