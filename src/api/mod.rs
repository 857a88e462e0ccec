/// HTTP API surface, mounted under /api/v1
use crate::context::AppContext;
use axum::{
    routing::{get, patch, post},
    Router,
};

mod users;

pub fn routes() -> Router<AppContext> {
    let users = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/refresh-token", post(users::refresh_token))
        .route("/change-password", post(users::change_password))
        .route("/me", get(users::current_user).patch(users::update_profile))
        .route("/me/avatar", patch(users::update_avatar))
        .route("/me/cover", patch(users::update_cover))
        .route("/history", get(users::watch_history))
        .route("/channel/:username", get(users::channel_profile))
        .route(
            "/channel/:username/subscribe",
            post(users::toggle_subscription),
        );

    Router::new().nest("/api/v1/users", users)
}
