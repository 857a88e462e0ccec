/// HTTP server assembly
use crate::{api, context::AppContext, response::ApiResponse};
use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

/// Build the full application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.service.cors_origin);
    let public = ServeDir::new(&ctx.config.service.public_directory);

    Router::new()
        .route("/health", get(health))
        .merge(api::routes())
        .nest_service("/public", public)
        .fallback(not_found)
        .with_state(ctx)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Credentials (cookies) are only allowed for a concrete origin; the "*"
/// wildcard cannot carry them.
fn cors_layer(origin: &str) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if origin == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(methods)
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true),
            Err(_) => {
                tracing::warn!(origin, "Invalid CORS origin, falling back to same-origin only");
                CorsLayer::new()
            }
        }
    }
}

async fn health() -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({"status": "ok"}), "Service is healthy")
}

async fn not_found() -> impl IntoResponse {
    ApiResponse::new(
        StatusCode::NOT_FOUND,
        serde_json::Value::Null,
        "Resource not found",
    )
}


/// Bind and serve until the task is cancelled
pub async fn serve(ctx: AppContext) -> crate::error::ApiResult<()> {
    let address = format!(
        "{}:{}",
        ctx.config.service.hostname, ctx.config.service.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "VidStream account backend listening");

    let router = build_router(ctx);
    axum::serve(listener, router)
        .await
        .map_err(|e| crate::error::ApiError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
