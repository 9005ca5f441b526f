//! Authentication service layer
//!
//! Business logic for registration, login, token refresh, and password
//! reset. Persistence and mail delivery are reached only through the
//! `IdentityStore` and `Mailer` collaborator traits.

use super::issuer::{Identity, TokenIssuer, TokenPair};
use super::jwt::Claims;
use super::password::{hash_password, validate_password_strength, verify_password};
use crate::error::AppError;
use base64::Engine;
use chrono::{Duration, Utc};
use eventline_core::{IdentityStore, Mailer, NewUser, User, UserRole};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request body
///
/// The body is the last extraction source; the dedicated header and the
/// cookie take precedence, so the field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    // Legacy clients send camelCase
    #[serde(alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Password reset request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RequestPasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

/// Password reset completion
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// User information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    #[schema(value_type = String)]
    pub role: UserRole,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Authentication response with tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Reset token validity window
const RESET_TOKEN_TTL_MINS: i64 = 60;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
    mailer: Arc<dyn Mailer>,
    issuer: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn IdentityStore>, mailer: Arc<dyn Mailer>, issuer: TokenIssuer) -> Self {
        Self {
            store,
            mailer,
            issuer,
        }
    }

    /// Verify a presented password against the stored account
    ///
    /// Returns `None` for both an unknown email and a wrong password, so a
    /// caller cannot distinguish the two (no account enumeration). Never
    /// errors for "not found".
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(None);
        };

        let matches = verify_password(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {e}")))?;

        Ok(matches.then_some(user))
    }

    /// Login with email and password
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let user = self
            .authenticate(&request.email, &request.password)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.issue_for(&user)
    }

    /// Register a new user account, then behave as a login
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        validate_password_strength(&request.password)
            .map_err(|e| AppError::BadRequest(format!("Password validation failed: {e}")))?;

        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

        let user = self
            .store
            .create(NewUser {
                email: request.email,
                name: request.name,
                password_hash,
                role: UserRole::Member,
                avatar_url: request.avatar_url,
            })
            .await?;

        // Welcome mail is best-effort; a mail outage must not fail signup
        if let Err(e) = self.mailer.send_welcome(&user.email, &user.name).await {
            tracing::warn!(email = %user.email, error = %e, "Failed to send welcome mail");
        }

        self.issue_for(&user)
    }

    /// Mint a new pair from a presented refresh token
    ///
    /// Returns the new pair together with the claims it was minted from.
    /// This is the only place a refresh failure surfaces to the caller; the
    /// transparent middleware path swallows these and proceeds
    /// unauthenticated instead.
    pub fn refresh(&self, refresh_token: &str) -> Result<(TokenPair, Claims), AppError> {
        let claims = self
            .issuer
            .verify_refresh(refresh_token)
            .map_err(|_| AppError::Unauthorized)?;

        let pair = self
            .issuer
            .issue(&Identity::from(&claims))
            .map_err(|e| AppError::Internal(format!("Failed to issue tokens: {e}")))?;

        Ok((pair, claims))
    }

    /// Get user info by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserInfo, AppError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(UserInfo::from(&user))
    }

    /// Start a password reset
    ///
    /// Succeeds whether or not the account exists; the caller learns
    /// nothing about registered emails.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(());
        };

        let token = generate_reset_token();
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINS);
        self.store.set_reset_token(user.id, &token, expires).await?;

        if let Err(e) = self
            .mailer
            .send_password_reset(&user.email, &user.name, &token)
            .await
        {
            tracing::warn!(email = %user.email, error = %e, "Failed to send reset mail");
        }

        Ok(())
    }

    /// Complete a password reset with a previously issued token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, AppError> {
        let user = self
            .store
            .find_by_reset_token(token)
            .await?
            .filter(|u| {
                u.reset_token_expires
                    .is_some_and(|expires| expires > Utc::now())
            })
            .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;

        validate_password_strength(new_password)
            .map_err(|e| AppError::BadRequest(format!("Password validation failed: {e}")))?;

        let password_hash = hash_password(new_password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

        self.store.update_password(user.id, &password_hash).await?;

        Ok(user)
    }

    fn issue_for(&self, user: &User) -> Result<AuthResponse, AppError> {
        let pair = self
            .issuer
            .issue(&Identity::from(user))
            .map_err(|e| AppError::Internal(format!("Failed to issue tokens: {e}")))?;

        Ok(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.issuer.access_ttl().as_secs(),
            user: UserInfo::from(user),
        })
    }
}

/// Generate a cryptographically random, URL-safe reset token
fn generate_reset_token() -> String {
    let token_bytes: [u8; 32] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::{InMemoryIdentityStore, LogMailer};
    use eventline_core::AuthConfig;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryIdentityStore::new()),
            Arc::new(LogMailer),
            TokenIssuer::from_config(&AuthConfig::default()),
        )
    }

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            email: "a@x.com".to_string(),
            password: "SecureP@ssw0rd1".to_string(),
            name: "Ada".to_string(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();

        let registered = service.register(register_request()).await.unwrap();
        assert_eq!(registered.user.email, "a@x.com");
        assert_eq!(registered.user.role, UserRole::Member);
        assert_eq!(registered.token_type, "Bearer");
        assert_eq!(registered.expires_in, 15 * 60);

        let logged_in = service
            .login(LoginRequest {
                email: "a@x.com".to_string(),
                password: "SecureP@ssw0rd1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let service = service();
        service.register(register_request()).await.unwrap();

        let result = service.register(register_request()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let service = service();
        let request = RegisterRequest {
            password: "weak".to_string(),
            ..register_request()
        };

        assert!(matches!(
            service.register(request).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let service = service();
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            ..register_request()
        };

        assert!(matches!(
            service.register(request).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_and_wrong_password_indistinguishable() {
        let service = service();
        service.register(register_request()).await.unwrap();

        let unknown = service.authenticate("nobody@x.com", "whatever").await.unwrap();
        let wrong = service.authenticate("a@x.com", "WrongP@ssw0rd1").await.unwrap();

        assert!(unknown.is_none());
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn test_login_failure_is_unauthorized() {
        let service = service();

        let result = service
            .login(LoginRequest {
                email: "nobody@x.com".to_string(),
                password: "p1".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_refresh_mints_a_live_pair() {
        let service = service();
        let auth = service.register(register_request()).await.unwrap();

        let (pair, claims) = service.refresh(&auth.refresh_token).unwrap();
        assert_eq!(claims.sub, auth.user.id);

        // The minted pair is a live, self-consistent credential set
        let access = service.issuer.verify_access(&pair.access_token).unwrap();
        assert_eq!(access.sub, auth.user.id);
        assert!(service.issuer.verify_refresh(&pair.refresh_token).is_ok());

        // Refreshing with an access token must fail
        assert!(matches!(
            service.refresh(&auth.access_token),
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let service = service();
        let auth = service.register(register_request()).await.unwrap();

        // Opaque for unknown accounts
        service.request_password_reset("nobody@x.com").await.unwrap();

        service.request_password_reset("a@x.com").await.unwrap();
        let user = service
            .store
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .unwrap();
        let token = user.reset_token.expect("reset token stored");

        service
            .reset_password(&token, "NewSecureP@ss1")
            .await
            .unwrap();

        // Old password no longer works, new one does
        assert!(service
            .authenticate("a@x.com", "SecureP@ssw0rd1")
            .await
            .unwrap()
            .is_none());
        let reauthed = service
            .authenticate("a@x.com", "NewSecureP@ss1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reauthed.id.to_string(), auth.user.id);
    }

    #[tokio::test]
    async fn test_reset_with_bogus_token_fails() {
        let service = service();
        let result = service.reset_password("bogus", "NewSecureP@ss1").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
