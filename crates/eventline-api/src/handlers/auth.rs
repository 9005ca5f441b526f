//! Authentication API handlers
//!
//! HTTP endpoints for registration, login, token refresh, logout, and
//! password reset. Token pairs returned by these endpoints are published on
//! both carriers: the JSON body (plus `x-access-token`/`x-refresh-token`
//! headers) for programmatic clients and `Set-Cookie` for browsers.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{
    AuthenticatedUser, LoginRequest, RefreshRequest, RegisterRequest,
    RequestPasswordResetRequest, ResetPasswordRequest, SessionTransport, TokenPair,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Message-only response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Register a new user account
///
/// Creates the account (default role `MEMBER`), dispatches a welcome mail,
/// and immediately behaves as a login: the new pair is returned in the body
/// and published on headers and cookies.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = crate::auth::AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let ip_address = extract_ip_address(&headers);
    let email = request.email.clone();

    let auth = match state.auth.register(request).await {
        Ok(auth) => auth,
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                email,
                reason: format!("{e:?}"),
                ip_address,
            });
            return Err(e);
        }
    };

    audit_log(&AuditEvent::RegistrationSuccess {
        user_id: Uuid::parse_str(&auth.user.id).unwrap_or_else(|_| Uuid::nil()),
        email: auth.user.email.clone(),
        role: auth.user.role.to_string(),
        ip_address,
    });

    let pair = TokenPair {
        access_token: auth.access_token.clone(),
        refresh_token: auth.refresh_token.clone(),
    };
    let mut response = (StatusCode::CREATED, Json(auth)).into_response();
    state.transport.publish(response.headers_mut(), &pair);

    Ok(response)
}

/// Login with email and password
///
/// A failed login is a uniform 401 with no detail on whether the account
/// exists.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::auth::AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);
    let email = request.email.clone();

    let auth = match state.auth.login(request).await {
        Ok(auth) => auth,
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                email,
                ip_address,
                user_agent,
            });
            return Err(e);
        }
    };

    audit_log(&AuditEvent::LoginSuccess {
        user_id: Uuid::parse_str(&auth.user.id).unwrap_or_else(|_| Uuid::nil()),
        email: auth.user.email.clone(),
        ip_address,
        user_agent,
    });

    let pair = TokenPair {
        access_token: auth.access_token.clone(),
        refresh_token: auth.refresh_token.clone(),
    };
    let mut response = Json(auth).into_response();
    state.transport.publish(response.headers_mut(), &pair);

    Ok(response)
}

/// Exchange a refresh token for a new token pair
///
/// The token is taken from the `x-refresh-token` header, the
/// `refresh_token` cookie, or the request body, in that order. This is the
/// only place a refresh failure surfaces to the caller.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body(content = RefreshRequest, description = "Refresh token (optional if sent via header or cookie)"),
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid or missing refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, AppError> {
    let refresh_token = SessionTransport::extract_refresh_token(&headers)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or(AppError::Unauthorized)?;

    let (pair, claims) = state.auth.refresh(&refresh_token)?;

    audit_log(&AuditEvent::TokenRefresh {
        user_id: Uuid::parse_str(&claims.sub).unwrap_or_else(|_| Uuid::nil()),
        email: claims.email,
        ip_address: extract_ip_address(&headers),
        silent: false,
    });

    let mut response = Json(pair.clone()).into_response();
    state.transport.publish(response.headers_mut(), &pair);

    Ok(response)
}

/// Logout the current session
///
/// Clears both token cookies. No token validation is performed; logout
/// always succeeds.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    audit_log(&AuditEvent::Logout {
        ip_address: extract_ip_address(&headers),
    });

    let mut response = Json(MessageResponse::new("Logged out successfully")).into_response();
    state.transport.clear(response.headers_mut());

    response
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = crate::auth::UserInfo),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let user_info = state.auth.get_user(user.user_id).await?;

    Ok(Json(user_info))
}

/// Start a password reset
///
/// Always answers with the same message so callers cannot probe for
/// registered emails.
#[utoipa::path(
    post,
    path = "/api/v1/auth/request-password-reset",
    tag = "auth",
    request_body = RequestPasswordResetRequest,
    responses(
        (status = 200, description = "Reset instructions dispatched if the account exists", body = MessageResponse),
    )
)]
pub async fn request_password_reset_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RequestPasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    audit_log(&AuditEvent::PasswordResetRequested {
        email: request.email.clone(),
    });

    state.auth.request_password_reset(&request.email).await?;

    Ok(Json(MessageResponse::new(
        "If the email exists, you will receive password reset instructions",
    )))
}

/// Complete a password reset
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = crate::error::ApiError),
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .reset_password(&request.token, &request.password)
        .await?;

    audit_log(&AuditEvent::PasswordResetCompleted {
        user_id: user.id,
        email: user.email,
    });

    Ok(Json(MessageResponse::new("Password reset successfully")))
}
