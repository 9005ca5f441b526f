//! Access/refresh token pair issuance
//!
//! Builds the dual-token pair from a user identity. The two tokens are
//! always minted together from the same claims snapshot, with distinct
//! secrets and lifetimes; issuance is a pure function of the identity and
//! the configured secrets.

use super::jwt::{sign_token, unix_now, verify_token, Claims, TokenError, TokenKind};
use eventline_core::{AuthConfig, User, UserRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

/// Authenticated principal an issued pair is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            subject: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl From<&Claims> for Identity {
    fn from(claims: &Claims) -> Self {
        Self {
            subject: Uuid::parse_str(&claims.sub).unwrap_or_else(|_| Uuid::nil()),
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// An access/refresh token pair, minted together, never independently
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and verifies the dual-token pair
///
/// Holds both signing secrets and lifetimes, captured once from
/// configuration at construction.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.jwt_secret.clone(),
            refresh_secret: config.jwt_refresh_secret.clone(),
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    /// Configured access token lifetime
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Mint a fresh token pair for an identity
    ///
    /// The refresh token carries both the `refresh` kind discriminator and
    /// the `is_refresh_token` marker claim.
    pub fn issue(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        let now = unix_now()?;

        let access = Claims {
            sub: identity.subject.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now,
            exp: now + self.access_ttl.as_secs(),
            kind: TokenKind::Access,
            is_refresh_token: false,
        };

        let refresh = Claims {
            sub: identity.subject.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now,
            exp: now + self.refresh_ttl.as_secs(),
            kind: TokenKind::Refresh,
            is_refresh_token: true,
        };

        Ok(TokenPair {
            access_token: sign_token(&self.access_secret, &access)?,
            refresh_token: sign_token(&self.refresh_secret, &refresh)?,
        })
    }

    /// Verify an access token
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = verify_token(&self.access_secret, token)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    /// Verify a refresh token
    ///
    /// Requires the refresh secret, the `refresh` kind, and the marker
    /// claim; anything less is rejected as invalid.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = verify_token(&self.refresh_secret, token)?;
        if claims.kind != TokenKind::Refresh || !claims.is_refresh_token {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}
