//! Request authentication middleware
//!
//! Two layers run here. `refresh_middleware` wraps every route and silently
//! rotates an expired access token when a valid refresh token accompanies
//! it, rewriting the request's `Authorization` header in place so the
//! downstream handler sees live credentials. `require_auth` guards
//! protected routes and inserts the authenticated user into request
//! extensions.
//!
//! The refresh layer never terminates a request: every branch that cannot
//! complete falls through to forwarding the request unchanged, deferring to
//! downstream authorization.

use super::issuer::{Identity, TokenIssuer, TokenPair};
use super::jwt::{Claims, TokenError};
use super::session::SessionTransport;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use eventline_core::UserRole;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Authenticated user information extracted from a verified access token
///
/// Added to request extensions by `require_auth`; handlers receive it via
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: Uuid::parse_str(&claims.sub).unwrap_or_else(|_| Uuid::nil()),
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Authentication middleware errors
///
/// Every variant renders the same 401 body: a caller learns that
/// authentication failed, never whether the token was absent, expired, or
/// forged.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": "UNAUTHORIZED",
            "message": "Authentication required",
        });

        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Terminal states of the per-request refresh decision
#[derive(Debug)]
pub(crate) enum RefreshState {
    /// No bearer header; pass through unauthenticated
    NoBearer,
    /// Access token verified; nothing to do
    ValidAccess,
    /// Access token malformed or forged; a bad token must never be
    /// "fixed" via the refresh path
    InvalidAccess,
    /// Access token expired, no companion refresh token found
    ExpiredNoRefresh,
    /// Access token expired, companion refresh token failed verification
    ExpiredBadRefresh,
    /// Refresh succeeded: a new pair was minted from the refresh claims
    Refreshed { claims: Claims, pair: TokenPair },
}

/// Decide what, if anything, to do about this request's credentials
///
/// Pure with respect to the request: reads headers, mints tokens on the
/// success path, mutates nothing.
pub(crate) fn evaluate_refresh(issuer: &TokenIssuer, headers: &HeaderMap) -> RefreshState {
    let Some(access_token) = bearer_token(headers) else {
        return RefreshState::NoBearer;
    };

    let err = match issuer.verify_access(access_token) {
        Ok(_) => return RefreshState::ValidAccess,
        Err(err) => err,
    };
    if !err.is_expired() {
        return RefreshState::InvalidAccess;
    }

    let Some(refresh_token) = SessionTransport::extract_refresh_token(headers) else {
        return RefreshState::ExpiredNoRefresh;
    };

    // verify_refresh checks secret, kind, and the marker claim
    let claims = match issuer.verify_refresh(&refresh_token) {
        Ok(claims) => claims,
        Err(_) => return RefreshState::ExpiredBadRefresh,
    };

    match issuer.issue(&Identity::from(&claims)) {
        Ok(pair) => RefreshState::Refreshed { claims, pair },
        Err(_) => RefreshState::ExpiredBadRefresh,
    }
}

/// Transparent token refresh middleware, applied to every route
///
/// On a successful refresh the current request proceeds with the new access
/// token substituted into its `Authorization` header, and the response
/// carries the new pair on both header and cookie channels so the client
/// can persist it. All other outcomes forward the request unchanged.
pub async fn refresh_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match evaluate_refresh(&state.issuer, request.headers()) {
        RefreshState::Refreshed { claims, pair } => {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", pair.access_token)) {
                request.headers_mut().insert(header::AUTHORIZATION, value);
            }

            audit_log(&AuditEvent::TokenRefresh {
                user_id: Uuid::parse_str(&claims.sub).unwrap_or_else(|_| Uuid::nil()),
                email: claims.email.clone(),
                ip_address: extract_ip_address(request.headers()),
                silent: true,
            });

            let mut response = next.run(request).await;
            state.transport.publish(response.headers_mut(), &pair);
            response
        }
        outcome => {
            tracing::trace!(?outcome, "no token rotation for this request");
            next.run(request).await
        }
    }
}

/// Authentication guard for protected routes
///
/// Verifies the bearer access token and inserts `AuthenticatedUser` into
/// request extensions. Runs after `refresh_middleware`, so an expired but
/// refreshable session arrives here already carrying a fresh token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let ip_address = extract_ip_address(request.headers());
    let user_agent = extract_user_agent(request.headers());

    let token = bearer_token(request.headers()).ok_or(AuthError::MissingAuthHeader)?;

    let claims = match state.issuer.verify_access(token) {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address,
                user_agent,
                reason: e.to_string(),
            });
            return Err(AuthError::InvalidToken(e));
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}
