//! Router assembly and shared API state.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::docs::openapi_handler;
use crate::api::handlers::auth::{
    change_password_handler, current_account_handler, forgot_password_handler, login_handler,
    logout_handler, refresh_token_handler, reset_password_handler,
};
use crate::api::handlers::health::health_handler;
use crate::auth::middleware::authenticate;
use crate::auth::reset_service::PasswordResetService;
use crate::auth::session_service::SessionService;
use crate::auth::tokens::TokenIssuer;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::mail::mailer_from_config;
use crate::storage::repositories::{
    AccountRepository, AuditLogRepository, SqlxAccountRepository,
};
use crate::storage::DbPool;

/// Shared state handed to every handler and the auth middleware.
#[derive(Clone)]
pub struct ApiState {
    pub session_service: Arc<SessionService>,
    pub reset_service: Arc<PasswordResetService>,
    pub issuer: Arc<TokenIssuer>,
    pub accounts: Arc<dyn AccountRepository>,
    pub secure_cookies: bool,
}

impl ApiState {
    /// Wire the full service stack over a database pool.
    pub fn from_config(pool: DbPool, config: &AppConfig) -> Result<Self> {
        let accounts: Arc<dyn AccountRepository> =
            Arc::new(SqlxAccountRepository::new(pool.clone()));
        let audit = Arc::new(AuditLogRepository::new(pool.clone()));
        let hasher = Arc::new(crate::auth::hashing::PasswordHasher::new(&config.auth)?);
        let issuer = Arc::new(TokenIssuer::new(&config.auth));
        let mailer = mailer_from_config(&config.smtp)?;

        let session_service = Arc::new(SessionService::new(
            accounts.clone(),
            audit.clone(),
            hasher.clone(),
            issuer.clone(),
        )?);
        let reset_service = Arc::new(PasswordResetService::new(
            accounts.clone(),
            audit,
            hasher,
            mailer,
            config.auth.reset_token_ttl(),
            config.server.public_base_url.clone(),
        ));

        Ok(Self {
            session_service,
            reset_service,
            issuer,
            accounts,
            secure_cookies: config.server.secure_cookies,
        })
    }
}

/// Build the application router.
pub fn build_router(state: ApiState, enable_cors: bool) -> Router {
    let secured = Router::new()
        .route("/api/v1/auth/logout", post(logout_handler))
        .route("/api/v1/auth/change-password", post(change_password_handler))
        .route("/api/v1/auth/me", get(current_account_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let public = Router::new()
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/refresh-token", post(refresh_token_handler))
        .route("/api/v1/auth/forgot-password", post(forgot_password_handler))
        .route("/api/v1/auth/reset-password/{token}", post(reset_password_handler))
        .route("/health", get(health_handler))
        .route("/api-docs/openapi.json", get(openapi_handler));

    let router = public.merge(secured).with_state(state).layer(TraceLayer::new_for_http());

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
