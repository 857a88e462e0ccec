/// VidStream account backend
///
/// User registration, credential login, JWT session management with refresh
/// rotation, profile updates, and channel profile aggregation over SQLite.
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod account;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod password;
mod profile;
mod response;
mod server;
mod token;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidstream=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match config::ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = match context::AppContext::new(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::serve(ctx).await {
        tracing::error!("Server exited with error: {}", e);
        std::process::exit(1);
    }
}
