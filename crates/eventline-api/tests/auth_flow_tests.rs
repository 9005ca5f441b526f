//! Auth flow integration tests
//!
//! Exercises the full router: registration, login, the transparent refresh
//! middleware, the explicit refresh endpoint, and logout. Expired access
//! tokens are minted directly with a back-dated `exp` so no test sleeps.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use eventline_api::auth::{sign_token, Claims, TokenIssuer, TokenKind};
use eventline_api::create_router_for_testing;
use eventline_core::{AuthConfig, UserRole};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Helper to create a JSON request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Register an account and return (user_id, email, access_token, refresh_token)
async fn register(app: &Router, email: &str) -> (String, String, String, String) {
    let response = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/register",
            Some(json!({
                "email": email,
                "password": "SecureP@ssw0rd1",
                "name": "Ada Lovelace",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = read_json(response).await;

    (
        json["user"]["id"].as_str().unwrap().to_string(),
        email.to_string(),
        json["access_token"].as_str().unwrap().to_string(),
        json["refresh_token"].as_str().unwrap().to_string(),
    )
}

/// Mint an access token for `user_id` that expired an hour ago, signed with
/// the same (default) secret the test router verifies against
fn expired_access_token(user_id: &str, email: &str) -> String {
    let config = AuthConfig::default();
    let now = unix_now();

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: UserRole::Member,
        iat: now - 7200,
        exp: now - 3600,
        kind: TokenKind::Access,
        is_refresh_token: false,
    };

    sign_token(&config.jwt_secret, &claims).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["status"], "ok");
}

// =============================================================================
// Registration and Login
// =============================================================================

#[tokio::test]
async fn test_register_returns_tokens_and_cookies() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/register",
            Some(json!({
                "email": "a@x.com",
                "password": "SecureP@ssw0rd1",
                "name": "Ada Lovelace",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    assert!(response.headers().contains_key("x-access-token"));
    assert!(response.headers().contains_key("x-refresh-token"));

    let cookies: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    for cookie in &cookies {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
    }

    let json = read_json(response).await;
    assert_eq!(json["user"]["email"], "a@x.com");
    assert_eq!(json["user"]["role"], "MEMBER");
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 15 * 60);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = create_router_for_testing();
    register(&app, "a@x.com").await;

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/register",
            Some(json!({
                "email": "a@x.com",
                "password": "SecureP@ssw0rd1",
                "name": "Someone Else",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_issues_verifiable_identity() {
    let app = create_router_for_testing();
    let (user_id, ..) = register(&app, "a@x.com").await;

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({"email": "a@x.com", "password": "SecureP@ssw0rd1"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;

    // The issued access token decodes to the registered identity
    let issuer = TokenIssuer::from_config(&AuthConfig::default());
    let claims = issuer
        .verify_access(json["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.role, UserRole::Member);
    assert_eq!(claims.exp - claims.iat, 15 * 60);
}

#[tokio::test]
async fn test_login_failure_is_uniform_401() {
    let app = create_router_for_testing();
    register(&app, "a@x.com").await;

    // Wrong password and unknown account yield identical responses
    let wrong_password = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({"email": "a@x.com", "password": "WrongP@ssw0rd1"})),
        ))
        .await
        .unwrap();
    let unknown_account = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({"email": "nobody@x.com", "password": "WrongP@ssw0rd1"})),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_account.status(), StatusCode::UNAUTHORIZED);

    let body_a = read_json(wrong_password).await;
    let body_b = read_json(unknown_account).await;
    assert_eq!(body_a, body_b);
}

// =============================================================================
// Protected routes and the transparent refresh
// =============================================================================

#[tokio::test]
async fn test_valid_access_token_passes_without_refresh() {
    let app = create_router_for_testing();
    let (user_id, _, access_token, _) = register(&app, "a@x.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // No rotation happened, so no new tokens were published
    assert!(!response.headers().contains_key("x-access-token"));
    assert!(response.headers().get_all(header::SET_COOKIE).iter().count() == 0);

    let json = read_json(response).await;
    assert_eq!(json["id"], user_id.as_str());
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_access_with_refresh_succeeds_transparently() {
    let app = create_router_for_testing();
    let (user_id, email, original_access, refresh_token) = register(&app, "a@x.com").await;
    let expired = expired_access_token(&user_id, &email);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .header("x-refresh-token", &refresh_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // The original request succeeds despite the expired access token
    assert_eq!(response.status(), StatusCode::OK);

    // A new pair is published on headers and cookies
    let new_access = response
        .headers()
        .get("x-access-token")
        .expect("new access token header")
        .to_str()
        .unwrap()
        .to_string();
    let new_refresh = response
        .headers()
        .get("x-refresh-token")
        .expect("new refresh token header")
        .to_str()
        .unwrap()
        .to_string();
    let cookies: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies.len(), 2);

    // Different strings than presented, same identity inside
    assert_ne!(new_access, expired);
    assert_ne!(new_access, original_access);
    assert_ne!(new_refresh, refresh_token);

    let issuer = TokenIssuer::from_config(&AuthConfig::default());
    let claims = issuer.verify_access(&new_access).unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.email, email);
    assert_eq!(claims.role, UserRole::Member);

    // The handler saw the authenticated identity
    let json = read_json(response).await;
    assert_eq!(json["id"], user_id.as_str());
}

#[tokio::test]
async fn test_refresh_token_from_cookie_also_works() {
    let app = create_router_for_testing();
    let (user_id, email, _, refresh_token) = register(&app, "a@x.com").await;
    let expired = expired_access_token(&user_id, &email);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .header(header::COOKIE, format!("refresh_token={refresh_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-access-token"));
}

#[tokio::test]
async fn test_expired_access_without_refresh_is_rejected() {
    let app = create_router_for_testing();
    let (user_id, email, ..) = register(&app, "a@x.com").await;
    let expired = expired_access_token(&user_id, &email);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Falls through to downstream authorization, which rejects
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.headers().contains_key("x-access-token"));
}

#[tokio::test]
async fn test_forged_access_token_never_triggers_refresh() {
    let app = create_router_for_testing();
    let (.., refresh_token) = register(&app, "a@x.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(header::AUTHORIZATION, "Bearer forged.token.value")
                .header("x-refresh-token", &refresh_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // A malformed access token must not be "fixed" by a valid refresh token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.headers().contains_key("x-access-token"));
}

#[tokio::test]
async fn test_expired_access_with_invalid_refresh_is_rejected() {
    let app = create_router_for_testing();
    let (user_id, email, access_token, _) = register(&app, "a@x.com").await;
    let expired = expired_access_token(&user_id, &email);

    // An access token in the refresh slot fails refresh verification
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .header("x-refresh-token", &access_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.headers().contains_key("x-access-token"));
}

#[tokio::test]
async fn test_concurrent_refreshes_are_tolerated() {
    let app = create_router_for_testing();
    let (user_id, email, _, refresh_token) = register(&app, "a@x.com").await;
    let expired = expired_access_token(&user_id, &email);

    let request = || {
        Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {expired}"))
            .header("x-refresh-token", &refresh_token)
            .body(Body::empty())
            .unwrap()
    };

    // Two in-flight requests with the same expired pair each mint their own
    // replacement; neither invalidates the other.
    let (first, second) = tokio::join!(
        app.clone().oneshot(request()),
        app.clone().oneshot(request())
    );

    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
}

// =============================================================================
// Refresh endpoint
// =============================================================================

#[tokio::test]
async fn test_refresh_endpoint_with_body_token() {
    let app = create_router_for_testing();
    let (user_id, _, _, refresh_token) = register(&app, "a@x.com").await;

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/refresh",
            Some(json!({"refresh_token": refresh_token})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;

    let issuer = TokenIssuer::from_config(&AuthConfig::default());
    let claims = issuer
        .verify_access(json["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, user_id);
    assert!(issuer
        .verify_refresh(json["refresh_token"].as_str().unwrap())
        .is_ok());
}

#[tokio::test]
async fn test_refresh_endpoint_with_header_token() {
    let app = create_router_for_testing();
    let (.., refresh_token) = register(&app, "a@x.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .header("x-refresh-token", &refresh_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_endpoint_rejects_access_token() {
    let app = create_router_for_testing();
    let (_, _, access_token, _) = register(&app, "a@x.com").await;

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/refresh",
            Some(json!({"refresh_token": access_token})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_endpoint_without_token_is_rejected() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_expires_cookies() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=;")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=;")));
    for cookie in &cookies {
        // Immediate expiry: a subsequent request presents no cookie token
        assert!(cookie.contains("Max-Age=0"));
    }
}

// =============================================================================
// Password reset
// =============================================================================

#[tokio::test]
async fn test_password_reset_request_is_opaque() {
    let app = create_router_for_testing();
    register(&app, "a@x.com").await;

    let known = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/request-password-reset",
            Some(json!({"email": "a@x.com"})),
        ))
        .await
        .unwrap();
    let unknown = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/request-password-reset",
            Some(json!({"email": "nobody@x.com"})),
        ))
        .await
        .unwrap();

    assert_eq!(known.status(), StatusCode::OK);
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(read_json(known).await, read_json(unknown).await);
}

#[tokio::test]
async fn test_reset_password_with_bogus_token_fails() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/auth/reset-password",
            Some(json!({"token": "bogus", "password": "NewSecureP@ss1"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
