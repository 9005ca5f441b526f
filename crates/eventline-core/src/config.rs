//! Eventline Configuration Management
//!
//! Handles configuration from environment variables and config files with
//! sensible defaults for development. Secrets and token lifetimes are read
//! once at process start; components receive an immutable reference at
//! construction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Authentication and token configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Auth
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        config.auth.jwt_refresh_secret = match std::env::var("JWT_REFRESH_SECRET") {
            Ok(secret) => secret,
            Err(_) => derive_refresh_secret(&config.auth.jwt_secret),
        };
        if let Ok(ttl) = std::env::var("JWT_EXPIRATION") {
            config.auth.access_expiration = ttl;
        }
        if let Ok(ttl) = std::env::var("JWT_REFRESH_EXPIRATION") {
            config.auth.refresh_expiration = ttl;
        }

        // APP_ENV is primary; NODE_ENV is honored for deployment manifests
        // that still set it.
        if let Ok(env) = std::env::var("APP_ENV").or_else(|_| std::env::var("NODE_ENV")) {
            config.auth.environment = env;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;

        if config.auth.jwt_refresh_secret.is_empty() {
            config.auth.jwt_refresh_secret = derive_refresh_secret(&config.auth.jwt_secret);
        }

        Ok(config)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Authentication configuration
///
/// Token lifetimes are kept as the configured strings (`"15m"`, `"7d"`) and
/// parsed on demand; the same value drives both token expiry and cookie
/// `Max-Age`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret for signing access tokens (HMAC-SHA256)
    pub jwt_secret: String,

    /// Secret for signing refresh tokens. Derived from `jwt_secret` when not
    /// configured, so the two token kinds never share a signing key.
    pub jwt_refresh_secret: String,

    /// Access token lifetime, unit-suffixed (`s|m|h|d`)
    pub access_expiration: String,

    /// Refresh token lifetime, unit-suffixed (`s|m|h|d`)
    pub refresh_expiration: String,

    /// Deployment environment; `production` enables the `Secure` cookie flag
    pub environment: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let jwt_secret = "development-secret-key-change-in-production".to_string();
        Self {
            jwt_refresh_secret: derive_refresh_secret(&jwt_secret),
            jwt_secret,
            access_expiration: "15m".to_string(),
            refresh_expiration: "7d".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl AuthConfig {
    /// Access token lifetime as a duration
    pub fn access_ttl(&self) -> Duration {
        parse_expiration(&self.access_expiration)
    }

    /// Refresh token lifetime as a duration
    pub fn refresh_ttl(&self) -> Duration {
        parse_expiration(&self.refresh_expiration)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Derive a refresh secret from the access secret
///
/// Keeps the two signing keys distinct even when only `JWT_SECRET` is
/// configured: an access token can never verify against the refresh key.
pub fn derive_refresh_secret(jwt_secret: &str) -> String {
    format!("{jwt_secret}_refresh")
}

/// Fallback lifetime for unparseable expiration strings: 15 minutes
const DEFAULT_EXPIRATION: Duration = Duration::from_secs(15 * 60);

/// Parse a unit-suffixed lifetime string (`"30s"`, `"15m"`, `"12h"`, `"7d"`)
///
/// Values that do not match `<digits><s|m|h|d>` fall back to 15 minutes.
pub fn parse_expiration(expiration: &str) -> Duration {
    let Some(unit) = expiration.chars().last() else {
        return DEFAULT_EXPIRATION;
    };

    let digits = &expiration[..expiration.len() - unit.len_utf8()];
    let Ok(value) = digits.parse::<u64>() else {
        return DEFAULT_EXPIRATION;
    };

    match unit {
        's' => Duration::from_secs(value),
        'm' => Duration::from_secs(value.saturating_mul(60)),
        'h' => Duration::from_secs(value.saturating_mul(60 * 60)),
        'd' => Duration::from_secs(value.saturating_mul(24 * 60 * 60)),
        _ => DEFAULT_EXPIRATION,
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,

    /// Emit JSON-formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}
