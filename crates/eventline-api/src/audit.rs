//! Security audit logging for authentication events
//!
//! Structured audit records for logins, registrations, token refreshes,
//! logouts, and password resets. Events are logged at INFO level with the
//! "audit" target so security teams can route them separately from
//! application logs.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events emitted by the auth subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user login
    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user registration
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        role: String,
        ip_address: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// Token pair rotation, either via the refresh endpoint or the
    /// transparent mid-request refresh
    TokenRefresh {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        silent: bool,
    },

    /// Logout request (clears the cookie session)
    Logout { ip_address: Option<String> },

    /// Invalid or expired token presented to a protected route
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Password reset requested (logged whether or not the account exists)
    PasswordResetRequested { email: String },

    /// Password reset completed
    PasswordResetCompleted { user_id: Uuid, email: String },
}

/// Log a security audit event with structured fields
///
/// The full event is serialized to JSON for log aggregators; the headline
/// fields are duplicated as structured attributes for filtering.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            email, ip_address, ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::RegistrationSuccess {
            user_id,
            email,
            role,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                role = %role,
                ip_address = ?ip_address,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure {
            email,
            reason,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "Registration failed"
            );
        }
        AuditEvent::TokenRefresh {
            user_id,
            email,
            ip_address,
            silent,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                silent = %silent,
                "Token refresh"
            );
        }
        AuditEvent::Logout { ip_address } => {
            info!(
                target: "audit",
                event = %event_json,
                ip_address = ?ip_address,
                "Logout"
            );
        }
        AuditEvent::InvalidToken {
            ip_address,
            user_agent,
            reason,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                ip_address = ?ip_address,
                user_agent = ?user_agent,
                reason = %reason,
                "Invalid token"
            );
        }
        AuditEvent::PasswordResetRequested { email } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                "Password reset requested"
            );
        }
        AuditEvent::PasswordResetCompleted { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "Password reset completed"
            );
        }
    }
}

/// Extract the client IP from request headers
///
/// Honors `X-Forwarded-For` (first hop) for reverse-proxy deployments.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = forwarded.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Extract the User-Agent string from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)?
        .to_str()
        .ok()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tags() {
        let event = AuditEvent::LoginFailure {
            email: "a@x.com".to_string(),
            ip_address: None,
            user_agent: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_failure\""));
        assert!(json.contains("a@x.com"));
    }

    #[test]
    fn test_extract_ip_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_ip_address(&headers), None);

        headers.insert("x-forwarded-for", "10.0.0.1, 172.16.0.1".parse().unwrap());
        assert_eq!(extract_ip_address(&headers), Some("10.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_user_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "curl/8.0".parse().unwrap());
        assert_eq!(extract_user_agent(&headers), Some("curl/8.0".to_string()));
    }
}
