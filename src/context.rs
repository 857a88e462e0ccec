/// Shared application context
///
/// Built once at startup and cloned into every handler as axum state.
use crate::{
    account::{AuthService, UserStore},
    config::ServerConfig,
    db,
    error::ApiResult,
    profile::ProfileQueries,
    token::TokenService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub auth: Arc<AuthService>,
    pub profiles: Arc<ProfileQueries>,
}

impl AppContext {
    /// Validate configuration, open the database, and wire up the services
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        tokio::fs::create_dir_all(&config.service.public_directory).await?;

        let pool = db::create_pool(
            &config.storage.account_db,
            db::DatabaseOptions::default(),
        )
        .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;
        tracing::info!(path = %config.storage.account_db.display(), "Account database ready");

        let auth = AuthService::new(
            UserStore::new(pool.clone()),
            TokenService::new(&config.auth),
            config.auth.bcrypt_cost,
        );
        let profiles = ProfileQueries::new(pool.clone());

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            auth: Arc::new(auth),
            profiles: Arc::new(profiles),
        })
    }
}
