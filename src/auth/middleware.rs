//! Axum middleware authenticating requests with an access token.
//!
//! The token is taken from the `accessToken` cookie or, for non-browser
//! clients, from an `Authorization: Bearer` header. On success the
//! account is loaded fresh and attached to the request as an
//! [`AuthContext`] extension.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{field, instrument, warn};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::account::Account;
use crate::auth::tokens::TokenKind;
use crate::errors::{AuthErrorType, Error};
use crate::storage::repositories::AccountRepository;

/// Access token cookie name
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Refresh token cookie name
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Identity attached to authenticated requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: Account,
}

/// Middleware entry point that authenticates requests against the access
/// token verifier and the account store.
#[instrument(
    name = "auth_middleware.authenticate",
    skip_all,
    fields(
        http_method = %request.method(),
        http_path = %request.uri().path(),
        account_id = field::Empty,
    )
)]
pub async fn authenticate(
    State(state): State<ApiState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_access_token(&jar, &request).ok_or_else(|| {
        ApiError::from(Error::auth("Access token is missing", AuthErrorType::MissingToken))
    })?;

    let claims = state.issuer.verify(&token, TokenKind::Access).map_err(|err| {
        warn!(error = %err, "access token verification failed");
        ApiError::from(err)
    })?;

    let account = state
        .accounts
        .find_by_id(&claims.account_id())
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(Error::not_found("Account")))?;

    tracing::Span::current().record("account_id", field::display(&account.id));
    request.extensions_mut().insert(AuthContext { account });

    Ok(next.run(request).await)
}

fn extract_access_token(jar: &CookieJar, request: &Request<Body>) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
