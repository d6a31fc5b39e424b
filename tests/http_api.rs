//! HTTP-level tests: routes, status codes, the response envelope, and
//! cookie handling.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::TestHarness;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use streamgate::api::{build_router, ApiState};
use streamgate::storage::repositories::AccountRepository;

async fn test_app(harness: &TestHarness) -> Router {
    let state = ApiState {
        session_service: Arc::new(harness.session.clone()),
        reset_service: Arc::new(harness.reset.clone()),
        issuer: harness.issuer.clone(),
        accounts: harness.accounts.clone() as Arc<dyn AccountRepository>,
        secure_cookies: true,
    };
    build_router(state, false)
}

struct TestResponse {
    status: StatusCode,
    body: Value,
    set_cookies: Vec<String>,
}

impl TestResponse {
    /// The value of a cookie set by this response.
    fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.set_cookies.iter().find(|c| c.starts_with(&prefix)).map(|c| {
            c[prefix.len()..].split(';').next().unwrap_or_default().to_string()
        })
    }
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    cookies: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(path);

    if !cookies.is_empty() {
        let cookie_header = cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(header::COOKIE, cookie_header);
    }

    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(|s| s.to_string()))
        .collect();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value =
        if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };

    TestResponse { status, body, set_cookies }
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let harness = TestHarness::new().await;
    let app = test_app(&harness).await;

    let response = send(&app, "GET", "/health", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn login_sets_secure_http_only_cookies_and_returns_tokens() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let response = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "Secret1" })),
        &[],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["user"]["username"], "ana");
    assert!(response.body["data"]["accessToken"].is_string());
    assert!(response.body["data"]["refreshToken"].is_string());

    // Two cookies, both HttpOnly + Secure.
    for name in ["accessToken", "refreshToken"] {
        let cookie = response
            .set_cookies
            .iter()
            .find(|c| c.starts_with(&format!("{}=", name)))
            .unwrap_or_else(|| panic!("missing {} cookie", name));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
    }
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized_with_error_envelope() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let wrong_password = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "nope" })),
        &[],
    )
    .await;
    let unknown_user = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "nobody", "password": "Secret1" })),
        &[],
    )
    .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body["success"], false);

    // No oracle: unknown user and wrong password read identically.
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.body["message"], wrong_password.body["message"]);
}

#[tokio::test]
async fn login_with_empty_fields_is_a_validation_error() {
    let harness = TestHarness::new().await;
    let app = test_app(&harness).await;

    let response = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "", "password": "" })),
        &[],
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn me_requires_and_honors_the_access_cookie() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let anonymous = send(&app, "GET", "/api/v1/auth/me", None, &[]).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let login = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "Secret1" })),
        &[],
    )
    .await;
    let access_token = login.cookie("accessToken").unwrap();

    let me = send(&app, "GET", "/api/v1/auth/me", None, &[("accessToken", &access_token)]).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["username"], "ana");
    // Sanitized profile only.
    assert!(me.body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn bearer_header_is_accepted_for_non_browser_clients() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let (_, pair) = harness.session.login("ana", "Secret1").await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", pair.access_token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_endpoint_rotates_the_cookie_pair() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let login = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "Secret1" })),
        &[],
    )
    .await;
    let refresh_token = login.cookie("refreshToken").unwrap();

    let refreshed = send(
        &app,
        "POST",
        "/api/v1/auth/refresh-token",
        None,
        &[("refreshToken", &refresh_token)],
    )
    .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let rotated = refreshed.cookie("refreshToken").unwrap();
    assert_ne!(rotated, refresh_token);

    // The pre-rotation cookie is now rejected.
    let replay = send(
        &app,
        "POST",
        "/api/v1/auth/refresh-token",
        None,
        &[("refreshToken", &refresh_token)],
    )
    .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_accepts_token_in_body_when_no_cookie_is_present() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let (_, pair) = harness.session.login("ana", "Secret1").await.unwrap();

    let response = send(
        &app,
        "POST",
        "/api/v1/auth/refresh-token",
        Some(json!({ "refreshToken": pair.refresh_token })),
        &[],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_any_token_is_unauthorized() {
    let harness = TestHarness::new().await;
    let app = test_app(&harness).await;

    let response = send(&app, "POST", "/api/v1/auth/refresh-token", None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_both_token_cookies() {
    let harness = TestHarness::new().await;
    let account = harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let login = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "Secret1" })),
        &[],
    )
    .await;
    let access_token = login.cookie("accessToken").unwrap();

    let logout = send(
        &app,
        "POST",
        "/api/v1/auth/logout",
        None,
        &[("accessToken", &access_token)],
    )
    .await;
    assert_eq!(logout.status, StatusCode::OK);

    // Cookies are replaced with empty values.
    assert_eq!(logout.cookie("accessToken").as_deref(), Some(""));
    assert_eq!(logout.cookie("refreshToken").as_deref(), Some(""));

    assert_eq!(harness.accounts.get_refresh_token(&account.id).await.unwrap(), None);
}

#[tokio::test]
async fn change_password_over_http_requires_correct_old_password() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let login = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "Secret1" })),
        &[],
    )
    .await;
    let access_token = login.cookie("accessToken").unwrap();

    let wrong = send(
        &app,
        "POST",
        "/api/v1/auth/change-password",
        Some(json!({ "oldPassword": "wrongOld", "newPassword": "BrandNewSecret1" })),
        &[("accessToken", &access_token)],
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let right = send(
        &app,
        "POST",
        "/api/v1/auth/change-password",
        Some(json!({ "oldPassword": "Secret1", "newPassword": "BrandNewSecret1" })),
        &[("accessToken", &access_token)],
    )
    .await;
    assert_eq!(right.status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_flow_over_http() {
    let harness = TestHarness::new().await;
    harness.seed_account("ana", "Secret1").await;
    let app = test_app(&harness).await;

    let known = send(
        &app,
        "POST",
        "/api/v1/auth/forgot-password",
        Some(json!({ "email": "ana@example.com" })),
        &[],
    )
    .await;
    let unknown = send(
        &app,
        "POST",
        "/api/v1/auth/forgot-password",
        Some(json!({ "email": "nobody@example.com" })),
        &[],
    )
    .await;

    // Known and unknown emails are indistinguishable from outside.
    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(known.body["message"], unknown.body["message"]);

    let raw_token = harness.last_reset_token();
    let reset = send(
        &app,
        "POST",
        &format!("/api/v1/auth/reset-password/{}", raw_token),
        Some(json!({ "password": "BrandNewSecret1" })),
        &[],
    )
    .await;
    assert_eq!(reset.status, StatusCode::OK);

    // Old password is gone, new one logs in.
    let old = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "Secret1" })),
        &[],
    )
    .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let fresh = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "identifier": "ana", "password": "BrandNewSecret1" })),
        &[],
    )
    .await;
    assert_eq!(fresh.status, StatusCode::OK);

    // A second use of the same link fails with the merged error.
    let replay = send(
        &app,
        "POST",
        &format!("/api/v1/auth/reset-password/{}", raw_token),
        Some(json!({ "password": "YetAnotherSecret1" })),
        &[],
    )
    .await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
}
