//! JWT token encoding and verification
//!
//! The cryptographic primitive of the auth subsystem: HMAC-SHA256 signed
//! JSON claims with an expiration window. Access and refresh tokens use the
//! same codec with different secrets; callers must be able to tell an
//! expired token from a forged or malformed one, so those failures map to
//! distinct error variants.

use eventline_core::UserRole;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Token kind discriminator embedded in every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential authorizing a single request window
    Access,
    /// Long-lived credential used solely to mint new access tokens
    Refresh,
}

/// Identity claims carried by every token
///
/// `sub`/`email`/`role` form the canonical authenticated-principal payload;
/// the rest describes the token itself. Refresh tokens additionally carry
/// the `is_refresh_token` marker on top of the `kind` discriminator, so a
/// leaked access secret alone never yields a usable refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: String,
    /// User's email address
    pub email: String,
    /// User's role
    pub role: UserRole,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// Token kind discriminator
    pub kind: TokenKind,
    /// Marker claim present only on refresh tokens
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_refresh_token: bool,
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Token encoding and verification errors
///
/// `Expired` fires exactly when `now > exp`; `InvalidSignature` covers a
/// wrong or mismatched secret; `Invalid` covers malformed structure. The
/// refresh orchestrator branches on `Expired` versus everything else.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed or invalid token")]
    Invalid,

    #[error("System time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),
}

impl TokenError {
    /// True only for the expiry failure; the refresh path must never fire
    /// for any other verification failure.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Current Unix timestamp in seconds
pub(crate) fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Sign claims into a compact JWT with the given secret
///
/// Never fails for well-formed claims; the only failure sources are the
/// system clock and serialization.
pub fn sign_token(secret: &str, claims: &Claims) -> Result<String, TokenError> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify a token against a secret and extract its claims
///
/// Expiry is checked with zero leeway so `Expired` means exactly
/// `now > exp`. A token signed with a different secret fails with
/// `InvalidSignature`, never `Expired`.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Invalid,
    })?;

    Ok(token_data.claims)
}
