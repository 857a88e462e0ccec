/// Configuration management for the VidStream account backend
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration, constructed once at startup and passed by
/// reference into the services. Business logic never reads the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Allowed cross-origin client address; "*" disables credentials
    pub cors_origin: String,
    /// Directory served as static assets under /public
    pub public_directory: PathBuf,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub account_db: PathBuf,
}

/// Authentication configuration: token secrets, lifetimes, hashing cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub bcrypt_cost: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("VIDSTREAM_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("VIDSTREAM_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let cors_origin = env::var("VIDSTREAM_CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());
        let public_directory = env::var("VIDSTREAM_PUBLIC_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));

        let data_directory: PathBuf = env::var("VIDSTREAM_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let account_db = env::var("VIDSTREAM_ACCOUNT_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("accounts.sqlite"));

        let access_token_secret = env::var("VIDSTREAM_ACCESS_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("Access token secret required".to_string()))?;
        let refresh_token_secret = env::var("VIDSTREAM_REFRESH_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("Refresh token secret required".to_string()))?;

        let access_token_ttl_minutes = env::var("VIDSTREAM_ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);
        let refresh_token_ttl_days = env::var("VIDSTREAM_REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let bcrypt_cost = env::var("VIDSTREAM_BCRYPT_COST")
            .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
            .parse()
            .unwrap_or(bcrypt::DEFAULT_COST);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                cors_origin,
                public_directory,
            },
            storage: StorageConfig {
                data_directory,
                account_db,
            },
            auth: AuthConfig {
                access_token_secret,
                refresh_token_secret,
                access_token_ttl_minutes,
                refresh_token_ttl_days,
                bcrypt_cost,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.access_token_secret.len() < 32 {
            return Err(ApiError::Validation(
                "Access token secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.refresh_token_secret.len() < 32 {
            return Err(ApiError::Validation(
                "Refresh token secret must be at least 32 characters".to_string(),
            ));
        }

        // A leaked token of one type must never verify as the other
        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(ApiError::Validation(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        if !(crate::password::MIN_BCRYPT_COST..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ApiError::Validation(
                "bcrypt cost must be between 4 and 31".to_string(),
            ));
        }

        Ok(())
    }
}
