//! Authentication endpoints: login, logout, refresh, password change, and
//! the password-reset pair.
//!
//! Tokens travel both as HttpOnly cookies (browser clients) and in the
//! JSON body (everything else). Handlers validate input, delegate to the
//! services, and translate outcomes into the stable response envelope.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::api::routes::ApiState;
use crate::auth::account::Account;
use crate::auth::middleware::{AuthContext, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::auth::tokens::TokenPair;
use crate::errors::Error;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    /// Username or email
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    /// Refresh token for non-browser clients; browsers send the cookie
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub old_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordBody {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: Account,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
}

fn auth_cookie(
    name: &'static str,
    value: String,
    max_age: chrono::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .expires(time::OffsetDateTime::from_unix_timestamp((Utc::now() + max_age).timestamp()).ok())
        .into()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .into()
}

fn add_token_cookies(jar: CookieJar, state: &ApiState, pair: &TokenPair) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        state.issuer.access_token_expiry(),
        state.secure_cookies,
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        state.issuer.refresh_token_expiry(),
        state.secure_cookies,
    ))
}

fn clear_token_cookies(jar: CookieJar, state: &ApiState) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE, state.secure_cookies))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE, state.secure_cookies))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Login successful", body = SessionData,
         headers(("Set-Cookie" = String, description = "accessToken and refreshToken cookies"))),
        (status = 400, description = "Missing identifier or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
    Json(payload): Json<LoginBody>,
) -> Result<(CookieJar, Json<ApiResponse<SessionData>>), ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let (account, pair) = state
        .session_service
        .login(&payload.identifier, &payload.password)
        .await
        .map_err(ApiError::from)?;

    let jar = add_token_cookies(jar, &state, &pair);
    let data = SessionData {
        user: account,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((jar, Json(ApiResponse::new(data, "Login successful"))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    request_body = RefreshBody,
    responses(
        (status = 200, description = "Tokens rotated", body = TokenData,
         headers(("Set-Cookie" = String, description = "Rotated accessToken and refreshToken cookies"))),
        (status = 401, description = "Missing, expired, or reused refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_token_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
    payload: Option<Json<RefreshBody>>,
) -> Result<(CookieJar, Json<ApiResponse<TokenData>>), ApiError> {
    // Cookie first, body fallback for non-browser clients.
    let from_cookie = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());
    let from_body = payload.and_then(|Json(body)| body.refresh_token);
    let presented = from_cookie.or(from_body);

    let (_, pair) = state
        .session_service
        .refresh(presented.as_deref())
        .await
        .map_err(ApiError::from)?;

    let jar = add_token_cookies(jar, &state, &pair);
    let data = TokenData { access_token: pair.access_token, refresh_token: pair.refresh_token };

    Ok((jar, Json(ApiResponse::new(data, "Access token refreshed"))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out",
         headers(("Set-Cookie" = String, description = "Cleared token cookies"))),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookieAuth" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<()>>), ApiError> {
    state.session_service.logout(&context.account.id).await.map_err(ApiError::from)?;

    let jar = clear_token_cookies(jar, &state);
    Ok((jar, Json(ApiResponse::message("Logged out successfully"))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    request_body = ChangePasswordBody,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Current password is incorrect")
    ),
    security(("cookieAuth" = [])),
    tag = "auth"
)]
pub async fn change_password_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<ChangePasswordBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    state
        .session_service
        .change_password(&context.account.id, &payload.old_password, &payload.new_password)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordBody,
    responses(
        (status = 200, description = "Reset link sent when the account exists"),
        (status = 400, description = "Validation error"),
        (status = 500, description = "Reset email could not be delivered")
    ),
    tag = "auth"
)]
pub async fn forgot_password_handler(
    State(state): State<ApiState>,
    Json(payload): Json<ForgotPasswordBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    state.reset_service.request_reset(&payload.email).await.map_err(ApiError::from)?;

    // The same answer whether or not the email is known.
    Ok(Json(ApiResponse::message(
        "If an account exists for that email, a password reset link has been sent",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password/{token}",
    request_body = ResetPasswordBody,
    params(("token" = String, Path, description = "Raw reset token from the emailed link")),
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Token invalid or expired")
    ),
    tag = "auth"
)]
pub async fn reset_password_handler(
    State(state): State<ApiState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    state
        .reset_service
        .consume_reset(&token, &payload.password)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::message("Password has been reset successfully")))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current account", body = Account),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookieAuth" = [])),
    tag = "auth"
)]
pub async fn current_account_handler(
    Extension(context): Extension<AuthContext>,
) -> Json<ApiResponse<Account>> {
    Json(ApiResponse::new(context.account, "Current account fetched"))
}
