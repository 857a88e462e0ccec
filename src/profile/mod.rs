/// Channel profile queries and the subscription edge
///
/// The profile read is one SQL statement over the users and subscriptions
/// tables so the counts and the viewer's subscription flag come from a
/// single consistent snapshot.
use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// Public channel projection: identity fields plus aggregate counts
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    #[serde(rename = "coverImage")]
    pub cover_image_url: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[derive(Clone)]
pub struct ProfileQueries {
    db: SqlitePool,
}

impl ProfileQueries {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Aggregate view of a channel as seen by `viewer_id` (None = anonymous,
    /// `is_subscribed` is false)
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> ApiResult<ChannelProfile> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(ApiError::Validation("Username is required".to_string()));
        }

        let profile = sqlx::query_as::<_, ChannelProfile>(
            "SELECT u.full_name, u.username, u.email, u.avatar_url, u.cover_image_url, \
             (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id) \
                 AS subscriber_count, \
             (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id) \
                 AS subscribed_to_count, \
             EXISTS(SELECT 1 FROM subscriptions s \
                    WHERE s.channel_id = u.id AND s.subscriber_id = ?2) \
                 AS is_subscribed \
             FROM users u WHERE u.username = ?1",
        )
        .bind(&username)
        .bind(viewer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

        Ok(profile)
    }

    /// Toggle the viewer's subscription to a channel. Returns true when the
    /// edge now exists. Subscribing to your own channel is allowed.
    pub async fn toggle_subscription(
        &self,
        subscriber_id: &str,
        channel_username: &str,
    ) -> ApiResult<bool> {
        let channel_username = channel_username.trim().to_lowercase();
        let channel_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE username = ?1")
                .bind(&channel_username)
                .fetch_optional(&self.db)
                .await?;
        let channel_id =
            channel_id.ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

        // Delete and insert share one transaction so a concurrent toggle
        // cannot slip between them and trip the UNIQUE edge constraint
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2",
        )
        .bind(subscriber_id)
        .bind(&channel_id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(subscriber_id)
        .bind(&channel_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::{NewUser, UserStore},
        db,
    };

    async fn seed_user(store: &UserStore, name: &str) -> String {
        let user = store
            .create(NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                full_name: name.to_string(),
                password_hash: "digest".to_string(),
                avatar_url: "https://cdn.example.com/a.png".to_string(),
                cover_image_url: None,
            })
            .await
            .unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_channel_profile_counts() {
        let pool = db::test_pool().await;
        let store = UserStore::new(pool.clone());
        let profiles = ProfileQueries::new(pool);

        seed_user(&store, "channel").await;
        let a = seed_user(&store, "alice").await;
        let b = seed_user(&store, "bob").await;
        let c = seed_user(&store, "carol").await;

        for subscriber in [&a, &b, &c] {
            assert!(profiles
                .toggle_subscription(subscriber, "channel")
                .await
                .unwrap());
        }

        let profile = profiles
            .channel_profile("channel", Some(&a))
            .await
            .unwrap();
        assert_eq!(profile.subscriber_count, 3);
        assert_eq!(profile.subscribed_to_count, 0);
        assert!(profile.is_subscribed);

        let as_stranger = profiles.channel_profile("channel", None).await.unwrap();
        assert!(!as_stranger.is_subscribed);

        let alice_profile = profiles.channel_profile("alice", Some(&b)).await.unwrap();
        assert_eq!(alice_profile.subscriber_count, 0);
        assert_eq!(alice_profile.subscribed_to_count, 1);
        assert!(!alice_profile.is_subscribed);
    }

    #[tokio::test]
    async fn test_channel_profile_normalizes_username() {
        let pool = db::test_pool().await;
        let store = UserStore::new(pool.clone());
        let profiles = ProfileQueries::new(pool);

        seed_user(&store, "channel").await;
        let profile = profiles
            .channel_profile("  Channel  ", None)
            .await
            .unwrap();
        assert_eq!(profile.username, "channel");
    }

    #[tokio::test]
    async fn test_unknown_channel_is_not_found() {
        let profiles = ProfileQueries::new(db::test_pool().await);
        assert!(matches!(
            profiles.channel_profile("ghost", None).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            profiles.channel_profile("  ", None).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_subscription() {
        let pool = db::test_pool().await;
        let store = UserStore::new(pool.clone());
        let profiles = ProfileQueries::new(pool);

        seed_user(&store, "channel").await;
        let viewer = seed_user(&store, "alice").await;

        assert!(profiles
            .toggle_subscription(&viewer, "channel")
            .await
            .unwrap());
        assert!(!profiles
            .toggle_subscription(&viewer, "channel")
            .await
            .unwrap());
        assert!(profiles
            .toggle_subscription(&viewer, "channel")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_toggles_never_error() {
        let pool = db::test_pool().await;
        let store = UserStore::new(pool.clone());
        let profiles = ProfileQueries::new(pool);

        seed_user(&store, "channel").await;
        let viewer = seed_user(&store, "alice").await;

        // Two racing toggles must resolve as one subscribe and one
        // unsubscribe, never a constraint violation
        let (a, b) = tokio::join!(
            profiles.toggle_subscription(&viewer, "channel"),
            profiles.toggle_subscription(&viewer, "channel"),
        );
        let a = a.unwrap();
        let b = b.unwrap();
        assert_ne!(a, b);

        let profile = profiles
            .channel_profile("channel", Some(&viewer))
            .await
            .unwrap();
        assert_eq!(profile.subscriber_count, 0);
        assert!(!profile.is_subscribed);
    }

    #[tokio::test]
    async fn test_self_subscription_is_allowed() {
        let pool = db::test_pool().await;
        let store = UserStore::new(pool.clone());
        let profiles = ProfileQueries::new(pool);

        let me = seed_user(&store, "channel").await;
        assert!(profiles.toggle_subscription(&me, "channel").await.unwrap());

        let profile = profiles.channel_profile("channel", Some(&me)).await.unwrap();
        assert_eq!(profile.subscriber_count, 1);
        assert_eq!(profile.subscribed_to_count, 1);
        assert!(profile.is_subscribed);
    }
}
