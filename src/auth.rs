/// Request authentication
///
/// The access guard for protected routes. Accepts the access token from the
/// `access_token` cookie or an `Authorization: Bearer` header, resolves it
/// to a live account, and rejects everything else with a single 401 shape.
use crate::{context::AppContext, db::user::User, error::ApiError};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Pull the access token out of the request, cookie first, bearer header
/// as the non-browser fallback
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = CookieJar::from_headers(headers).get(ACCESS_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// The authenticated account behind the current request
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)
            .ok_or_else(|| ApiError::Auth("Unauthorized request".to_string()))?;

        let user = ctx.auth.authenticate(&token).await?;
        Ok(AuthUser(user))
    }
}
