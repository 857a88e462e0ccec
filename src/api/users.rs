/// User account endpoints
///
/// Tokens travel both ways: every issuing endpoint returns them in the JSON
/// envelope and sets them as http-only cookies, so browser clients and API
/// clients share one surface.
use crate::{
    account::{
        ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
        UpdateAvatarRequest, UpdateCoverRequest, UpdateProfileRequest,
    },
    auth::{AuthUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    context::AppContext,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// POST /api/v1/users/register
pub async fn register(
    State(ctx): State<AppContext>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = ctx.auth.register(request).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

/// POST /api/v1/users/login
pub async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, pair) = ctx.auth.login(request).await?;

    let jar = jar
        .add(auth_cookie(ACCESS_TOKEN_COOKIE, pair.access_token.clone()))
        .add(auth_cookie(REFRESH_TOKEN_COOKIE, pair.refresh_token.clone()));

    let body = LoginResponse {
        user,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };
    Ok((jar, ApiResponse::ok(body, "User logged in successfully")))
}

/// POST /api/v1/users/logout
pub async fn logout(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    ctx.auth.logout(&user.id).await?;

    let jar = jar
        .remove(removal_cookie(ACCESS_TOKEN_COOKIE))
        .remove(removal_cookie(REFRESH_TOKEN_COOKIE));

    Ok((
        jar,
        ApiResponse::ok(serde_json::json!({}), "User logged out successfully"),
    ))
}

/// POST /api/v1/users/refresh-token
///
/// The presented token comes from the JSON body or the refresh cookie.
pub async fn refresh_token(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    request: Option<Json<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    let presented = request
        .and_then(|Json(r)| r.refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            jar.get(REFRESH_TOKEN_COOKIE)
                .map(|c| c.value().to_string())
        })
        .ok_or_else(|| ApiError::Auth("Unauthorized request".to_string()))?;

    let pair = ctx.auth.refresh_session(&presented).await?;

    let jar = jar
        .add(auth_cookie(ACCESS_TOKEN_COOKIE, pair.access_token.clone()))
        .add(auth_cookie(REFRESH_TOKEN_COOKIE, pair.refresh_token.clone()));

    Ok((
        jar,
        ApiResponse::ok(pair, "Access token refreshed successfully"),
    ))
}

/// POST /api/v1/users/change-password
pub async fn change_password(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.auth.change_password(&user, request).await?;
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

/// GET /api/v1/users/me
pub async fn current_user(AuthUser(user): AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::ok(
        crate::account::UserView::from(user),
        "Current user fetched successfully",
    ))
}

/// PATCH /api/v1/users/me
pub async fn update_profile(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = ctx.auth.update_profile(&user.id, request).await?;
    Ok(ApiResponse::ok(updated, "Account details updated successfully"))
}

/// PATCH /api/v1/users/me/avatar
pub async fn update_avatar(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateAvatarRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = ctx.auth.update_avatar(&user.id, &request.avatar).await?;
    Ok(ApiResponse::ok(updated, "Avatar updated successfully"))
}

/// PATCH /api/v1/users/me/cover
pub async fn update_cover(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateCoverRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = ctx
        .auth
        .update_cover_image(&user.id, &request.cover_image)
        .await?;
    Ok(ApiResponse::ok(updated, "Cover image updated successfully"))
}

/// GET /api/v1/users/history
pub async fn watch_history(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let history = ctx.auth.watch_history(&user.id).await?;
    Ok(ApiResponse::ok(
        history,
        "Watch history fetched successfully",
    ))
}

/// GET /api/v1/users/channel/:username
pub async fn channel_profile(
    State(ctx): State<AppContext>,
    AuthUser(viewer): AuthUser,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let profile = ctx
        .profiles
        .channel_profile(&username, Some(&viewer.id))
        .await?;
    Ok(ApiResponse::ok(
        profile,
        "Channel profile fetched successfully",
    ))
}

/// POST /api/v1/users/channel/:username/subscribe
pub async fn toggle_subscription(
    State(ctx): State<AppContext>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let subscribed = ctx.profiles.toggle_subscription(&user.id, &username).await?;
    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(
        serde_json::json!({ "subscribed": subscribed }),
        message,
    ))
}
