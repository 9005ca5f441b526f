//! Eventline Core - Domain models, collaborator traits, and shared types
//!
//! This crate defines the core abstractions used throughout the Eventline
//! backend:
//! - User account model and roles
//! - Common error types
//! - Collaborator traits for identity storage and mail dispatch
//! - Configuration management

pub mod config;

pub use config::{AppConfig, AuthConfig, ConfigError, LoggingConfig, ServerConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Eventline operations
#[derive(Error, Debug)]
pub enum EventlineError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Mail error: {0}")]
    MailError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EventlineError>;

// ============================================================================
// User Model
// ============================================================================

/// User role within the platform
///
/// - `Admin`: full access including user management
/// - `Organizer`: can create and manage events
/// - `Member`: regular attendee account, the default at registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Organizer,
    #[default]
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Organizer => "ORGANIZER",
            Self::Member => "MEMBER",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = EventlineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "ORGANIZER" => Ok(Self::Organizer),
            "MEMBER" => Ok(Self::Member),
            other => Err(EventlineError::ValidationError(format!(
                "Unknown role: {other}"
            ))),
        }
    }
}

/// A user account as stored by the identity collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Argon2 PHC string, never the plaintext
    pub password_hash: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a new user account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Identity storage collaborator
///
/// The auth subsystem never talks to a database directly; it consumes this
/// narrow interface. Production wires a persistent implementation, tests and
/// development use the in-memory one shipped with the API crate.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Create a new account. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()>;
}

/// Outbound mail collaborator
///
/// Delivery (SMTP, templates, retries) lives behind this trait and is out of
/// scope for the auth core.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, to: &str, name: &str) -> Result<()>;

    async fn send_password_reset(&self, to: &str, name: &str, token: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Member).unwrap(), "\"MEMBER\"");
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");

        let role: UserRole = serde_json::from_str("\"ORGANIZER\"").unwrap();
        assert_eq!(role, UserRole::Organizer);
    }

    #[test]
    fn test_role_default_is_member() {
        assert_eq!(UserRole::default(), UserRole::Member);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("editor".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_display_round_trip() {
        for role in [UserRole::Admin, UserRole::Organizer, UserRole::Member] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
    }
}
