//! OpenAPI document for the authentication API.

use axum::Json;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers;
use crate::auth::account::Account;
use crate::auth::middleware::ACCESS_TOKEN_COOKIE;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookieAuth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_TOKEN_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        handlers::auth::login_handler,
        handlers::auth::refresh_token_handler,
        handlers::auth::logout_handler,
        handlers::auth::change_password_handler,
        handlers::auth::forgot_password_handler,
        handlers::auth::reset_password_handler,
        handlers::auth::current_account_handler,
        handlers::health::health_handler,
    ),
    components(schemas(
        Account,
        handlers::auth::LoginBody,
        handlers::auth::RefreshBody,
        handlers::auth::ChangePasswordBody,
        handlers::auth::ForgotPasswordBody,
        handlers::auth::ResetPasswordBody,
        handlers::auth::SessionData,
        handlers::auth::TokenData,
        handlers::health::HealthStatus,
    )),
    tags(
        (name = "auth", description = "Login, session, and password management"),
        (name = "health", description = "Service liveness")
    )
)]
pub struct ApiDoc;

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/auth/login"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/auth/refresh-token"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/auth/reset-password/{token}"));
    }
}
