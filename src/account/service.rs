/// Authentication and account lifecycle service
///
/// Owns the account state machine: anonymous, authenticated with a live
/// access/refresh pair, revoked on logout, re-authenticated on refresh.
/// Validation and normalization happen here; the store only persists.
use super::{
    store::NewUser, ChangePasswordRequest, LoginRequest, RegisterRequest, TokenPair,
    UpdateProfileRequest, UserStore, UserView,
};
use crate::{
    db::user::User,
    error::{ApiError, ApiResult},
    password,
    token::TokenService,
};
use validator::Validate;

pub struct AuthService {
    store: UserStore,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: UserStore, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self {
            store,
            tokens,
            bcrypt_cost,
        }
    }

    /// Register a new account. Media references arrive already resolved.
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<UserView> {
        let username = request.username.trim().to_lowercase();
        let email = request.email.trim().to_lowercase();
        let full_name = request.full_name.trim().to_string();
        let avatar_url = request.avatar_url.trim().to_string();

        // The password is checked for emptiness after trim but hashed as
        // given; login and change_password verify the raw string.
        if username.is_empty()
            || email.is_empty()
            || full_name.is_empty()
            || request.password.trim().is_empty()
        {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }
        if avatar_url.is_empty() {
            return Err(ApiError::Validation("Avatar is required".to_string()));
        }

        let normalized = RegisterRequest {
            username,
            email,
            full_name,
            password: request.password,
            avatar_url,
            cover_image_url: request
                .cover_image_url
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        };
        normalized
            .validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let password_hash = password::hash_password(&normalized.password, self.bcrypt_cost)?;

        let user = self
            .store
            .create(NewUser {
                username: normalized.username,
                email: normalized.email,
                full_name: normalized.full_name,
                password_hash,
                avatar_url: normalized.avatar_url,
                cover_image_url: normalized.cover_image_url,
            })
            .await?;

        tracing::info!(username = %user.username, "Registered new user");

        Ok(user.into())
    }

    /// Authenticate by username or email and issue a fresh token pair
    pub async fn login(&self, request: LoginRequest) -> ApiResult<(UserView, TokenPair)> {
        let identifier = request
            .username
            .as_deref()
            .or(request.email.as_deref())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Validation("Username or email is required".to_string()))?;

        let user = self
            .store
            .find_by_identifier(&identifier)
            .await?
            .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

        if !password::verify_password(&request.password, &user.password_hash)? {
            return Err(ApiError::Auth("Invalid user credentials".to_string()));
        }

        let pair = self.issue_pair(&user)?;
        self.store
            .set_refresh_token(&user.id, &pair.refresh_token)
            .await?;

        tracing::info!(username = %user.username, "User logged in");

        Ok((user.into(), pair))
    }

    /// Revoke the current refresh token. Idempotent.
    pub async fn logout(&self, user_id: &str) -> ApiResult<()> {
        self.store.clear_refresh_token(user_id).await
    }

    /// Exchange a refresh token for a new pair, rotating the stored token.
    ///
    /// Rotation is a compare-and-swap against the presented token, so a
    /// replayed or concurrently rotated token loses and gets a 401.
    pub async fn refresh_session(&self, presented: &str) -> ApiResult<TokenPair> {
        let claims = self.tokens.decode_refresh(presented).map_err(|e| {
            tracing::debug!(reason = %e, "Refresh token rejected");
            ApiError::Auth("Invalid refresh token".to_string())
        })?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

        let pair = self.issue_pair(&user)?;
        let rotated = self
            .store
            .rotate_refresh_token(&user.id, presented, &pair.refresh_token)
            .await?;
        if !rotated {
            return Err(ApiError::Auth(
                "Refresh token is expired or already used".to_string(),
            ));
        }

        Ok(pair)
    }

    /// Change the account password. The current refresh token stays valid;
    /// clients that want a full re-login must log out explicitly.
    pub async fn change_password(
        &self,
        user: &User,
        request: ChangePasswordRequest,
    ) -> ApiResult<()> {
        if request.old_password.trim().is_empty() || request.new_password.trim().is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }
        if request.new_password.len() < 8 {
            return Err(ApiError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        if !password::verify_password(&request.old_password, &user.password_hash)? {
            return Err(ApiError::Auth("Invalid old password".to_string()));
        }

        let password_hash = password::hash_password(&request.new_password, self.bcrypt_cost)?;
        self.store.update_password(&user.id, &password_hash).await
    }

    /// Resolve an access token to its account. Any verification failure or a
    /// since-deleted account collapses to a single unauthorized outcome.
    pub async fn authenticate(&self, access_token: &str) -> ApiResult<User> {
        let claims = self.tokens.decode_access(access_token).map_err(|e| {
            tracing::debug!(reason = %e, "Access token rejected");
            ApiError::Auth("Invalid access token".to_string())
        })?;

        self.store
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::Auth("Invalid access token".to_string()))
    }

    /// Update full name and/or email; at least one field must be present
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> ApiResult<UserView> {
        let full_name = request
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let email = request
            .email
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        if full_name.is_none() && email.is_none() {
            return Err(ApiError::Validation(
                "At least one of fullName or email is required".to_string(),
            ));
        }

        let user = self
            .store
            .update_profile(user_id, full_name, email.as_deref())
            .await?;
        Ok(user.into())
    }

    /// Replace the avatar reference
    pub async fn update_avatar(&self, user_id: &str, avatar: &str) -> ApiResult<UserView> {
        let avatar = avatar.trim();
        if avatar.is_empty() {
            return Err(ApiError::Validation("Avatar is required".to_string()));
        }

        let user = self.store.update_avatar(user_id, avatar).await?;
        Ok(user.into())
    }

    /// Replace the cover image reference
    pub async fn update_cover_image(&self, user_id: &str, cover: &str) -> ApiResult<UserView> {
        let cover = cover.trim();
        if cover.is_empty() {
            return Err(ApiError::Validation("Cover image is required".to_string()));
        }

        let user = self.store.update_cover_image(user_id, cover).await?;
        Ok(user.into())
    }

    /// Ordered watch-history video references for an account
    pub async fn watch_history(&self, user_id: &str) -> ApiResult<Vec<String>> {
        let entries = self.store.watch_history(user_id).await?;
        Ok(entries.into_iter().map(|e| e.video_ref).collect())
    }

    fn issue_pair(&self, user: &User) -> ApiResult<TokenPair> {
        let access_token = self
            .tokens
            .issue_access(user)
            .map_err(|e| ApiError::Internal(format!("Token issuance failed: {}", e)))?;
        let refresh_token = self
            .tokens
            .issue_refresh(user)
            .map_err(|e| ApiError::Internal(format!("Token issuance failed: {}", e)))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AuthConfig, db};

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret-for-testing-0123456789ab".to_string(),
            refresh_token_secret: "refresh-secret-for-testing-0123456789a".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 10,
            bcrypt_cost: crate::password::MIN_BCRYPT_COST,
        }
    }

    async fn test_service() -> AuthService {
        let config = test_auth_config();
        AuthService::new(
            UserStore::new(db::test_pool().await),
            TokenService::new(&config),
            config.bcrypt_cost,
        )
    }

    fn register_request(n: u32) -> RegisterRequest {
        RegisterRequest {
            username: format!("user{}", n),
            email: format!("user{}@example.com", n),
            full_name: format!("User {}", n),
            password: "correct horse".to_string(),
            avatar_url: "https://cdn.example.com/a.png".to_string(),
            cover_image_url: None,
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_and_sanitizes() {
        let service = test_service().await;

        let mut request = register_request(1);
        request.username = "  User1  ".to_string();
        request.email = "  USER1@Example.COM ".to_string();

        let view = service.register(request).await.unwrap();
        assert_eq!(view.username, "user1");
        assert_eq!(view.email, "user1@example.com");

        // Sanitized view serializes without credential material
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refreshToken").is_none());
    }

    #[tokio::test]
    async fn test_whitespace_padded_password_round_trips() {
        let service = test_service().await;

        let mut request = register_request(1);
        request.password = " padded secret ".to_string();
        service.register(request).await.unwrap();

        // The exact string the user registered with must verify
        let (_, pair) = service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: " padded secret ".to_string(),
            })
            .await
            .unwrap();

        // And it is the old password change_password checks against
        let user = service.authenticate(&pair.access_token).await.unwrap();
        service
            .change_password(
                &user,
                ChangePasswordRequest {
                    old_password: " padded secret ".to_string(),
                    new_password: " another padded one ".to_string(),
                },
            )
            .await
            .unwrap();

        service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: " another padded one ".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_rejects_blank_fields() {
        let service = test_service().await;

        let mut request = register_request(1);
        request.full_name = "   ".to_string();
        let err = service.register(request).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_requires_avatar() {
        let service = test_service().await;

        let mut request = register_request(1);
        request.avatar_url = "".to_string();
        match service.register(request).await {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "Avatar is required"),
            other => panic!("expected Validation, got {:?}", other.map(|v| v.username)),
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_conflicts() {
        let service = test_service().await;
        service.register(register_request(1)).await.unwrap();

        let err = service.register(register_request(1)).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_by_username_and_email() {
        let service = test_service().await;
        service.register(register_request(1)).await.unwrap();

        let (view, pair) = service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(view.username, "user1");
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());

        let (_, _) = service
            .login(LoginRequest {
                username: None,
                email: Some("user1@example.com".to_string()),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_failure_modes() {
        let service = test_service().await;
        service.register(register_request(1)).await.unwrap();

        let no_identifier = service
            .login(LoginRequest {
                username: None,
                email: None,
                password: "correct horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(no_identifier, ApiError::Validation(_)));

        let unknown = service
            .login(LoginRequest {
                username: Some("nobody".to_string()),
                email: None,
                password: "correct horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, ApiError::NotFound(_)));

        let bad_password = service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(bad_password, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_replay() {
        let service = test_service().await;
        service.register(register_request(1)).await.unwrap();
        let (_, pair) = service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        let next = service.refresh_session(&pair.refresh_token).await.unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);

        // The old token was rotated out and no longer matches the stored one
        let replay = service.refresh_session(&pair.refresh_token).await;
        assert!(matches!(replay, Err(ApiError::Auth(_))));

        // The new one still works
        service.refresh_session(&next.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_rejects_garbage_and_logout() {
        let service = test_service().await;
        service.register(register_request(1)).await.unwrap();
        let (view, pair) = service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(
            service.refresh_session("not.a.jwt").await,
            Err(ApiError::Auth(_))
        ));

        service.logout(&view.id).await.unwrap();
        assert!(matches!(
            service.refresh_session(&pair.refresh_token).await,
            Err(ApiError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = test_service().await;
        let view = service.register(register_request(1)).await.unwrap();
        let (_, pair) = service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        let user = service.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(user.id, view.id);

        let wrong_old = service
            .change_password(
                &user,
                ChangePasswordRequest {
                    old_password: "not it".to_string(),
                    new_password: "brand new pass".to_string(),
                },
            )
            .await;
        assert!(matches!(wrong_old, Err(ApiError::Auth(_))));

        service
            .change_password(
                &user,
                ChangePasswordRequest {
                    old_password: "correct horse".to_string(),
                    new_password: "brand new pass".to_string(),
                },
            )
            .await
            .unwrap();

        // New password works, old one does not
        service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: "brand new pass".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            service
                .login(LoginRequest {
                    username: Some("user1".to_string()),
                    email: None,
                    password: "correct horse".to_string(),
                })
                .await,
            Err(ApiError::Auth(_))
        ));

        // The refresh token issued before the change is still honored
        service.refresh_session(&pair.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_tokens() {
        let service = test_service().await;
        assert!(matches!(
            service.authenticate("garbage").await,
            Err(ApiError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_deleted_account() {
        let config = test_auth_config();
        let pool = db::test_pool().await;
        let store = UserStore::new(pool.clone());
        let service = AuthService::new(
            UserStore::new(pool),
            TokenService::new(&config),
            config.bcrypt_cost,
        );

        let view = service.register(register_request(1)).await.unwrap();
        let (_, pair) = service
            .login(LoginRequest {
                username: Some("user1".to_string()),
                email: None,
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert!(store.delete(&view.id).await.unwrap());

        // Token still verifies cryptographically but the account is gone
        assert!(matches!(
            service.authenticate(&pair.access_token).await,
            Err(ApiError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_requires_a_field() {
        let service = test_service().await;
        let view = service.register(register_request(1)).await.unwrap();

        let err = service
            .update_profile(
                &view.id,
                UpdateProfileRequest {
                    full_name: None,
                    email: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let updated = service
            .update_profile(
                &view.id,
                UpdateProfileRequest {
                    full_name: Some("Renamed".to_string()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_avatar_and_cover() {
        let service = test_service().await;
        let view = service.register(register_request(1)).await.unwrap();

        let updated = service
            .update_avatar(&view.id, "https://cdn.example.com/new.png")
            .await
            .unwrap();
        assert_eq!(updated.avatar_url, "https://cdn.example.com/new.png");

        assert!(matches!(
            service.update_avatar(&view.id, "  ").await,
            Err(ApiError::Validation(_))
        ));

        let updated = service
            .update_cover_image(&view.id, "https://cdn.example.com/cover.png")
            .await
            .unwrap();
        assert_eq!(
            updated.cover_image_url.as_deref(),
            Some("https://cdn.example.com/cover.png")
        );
    }
}
