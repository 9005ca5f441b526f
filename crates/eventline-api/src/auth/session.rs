//! Session transport: how token pairs travel to and from the client
//!
//! A pair rides two carriers at once: response headers for programmatic
//! clients and `HttpOnly` cookies for browser sessions. Extraction of the
//! companion refresh token tries an ordered list of sources until one
//! yields a value.

use super::issuer::TokenPair;
use axum::http::{header, HeaderMap, HeaderValue};
use eventline_core::AuthConfig;
use std::time::Duration;

/// Cookie name for the access token
pub const ACCESS_COOKIE: &str = "access_token";

/// Cookie name for the refresh token
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Response header carrying a freshly minted access token
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Request/response header carrying a refresh token
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Extract a cookie value from the Cookie header
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// One source a refresh token may arrive from
type RefreshExtractor = fn(&HeaderMap) -> Option<String>;

fn from_refresh_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REFRESH_TOKEN_HEADER)?
        .to_str()
        .ok()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn from_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    get_cookie(headers, REFRESH_COOKIE)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extraction order: dedicated header first, then cookie. The request body
/// is consulted only by the refresh endpoint itself, after both of these.
const REFRESH_EXTRACTORS: &[RefreshExtractor] = &[from_refresh_header, from_refresh_cookie];

/// Serializes token pairs onto responses and clears them on logout
#[derive(Debug, Clone)]
pub struct SessionTransport {
    secure_cookies: bool,
    access_max_age: Duration,
    refresh_max_age: Duration,
}

impl SessionTransport {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            secure_cookies: config.is_production(),
            access_max_age: config.access_ttl(),
            refresh_max_age: config.refresh_ttl(),
        }
    }

    /// Write a pair to both carriers of a response
    ///
    /// Sets `x-access-token` / `x-refresh-token` headers and appends one
    /// `Set-Cookie` per token. Cookies are `HttpOnly; SameSite=Lax; Path=/`
    /// with `Max-Age` from the configured lifetime, plus `Secure` in
    /// production.
    pub fn publish(&self, headers: &mut HeaderMap, pair: &TokenPair) {
        if let Ok(value) = HeaderValue::from_str(&pair.access_token) {
            headers.insert(ACCESS_TOKEN_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&pair.refresh_token) {
            headers.insert(REFRESH_TOKEN_HEADER, value);
        }

        self.append_cookie(
            headers,
            ACCESS_COOKIE,
            &pair.access_token,
            self.access_max_age.as_secs(),
        );
        self.append_cookie(
            headers,
            REFRESH_COOKIE,
            &pair.refresh_token,
            self.refresh_max_age.as_secs(),
        );
    }

    /// Expire both token cookies immediately
    pub fn clear(&self, headers: &mut HeaderMap) {
        self.append_cookie(headers, ACCESS_COOKIE, "", 0);
        self.append_cookie(headers, REFRESH_COOKIE, "", 0);
    }

    /// Find a refresh token on the request, trying each source in order
    pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
        REFRESH_EXTRACTORS
            .iter()
            .find_map(|extract| extract(headers))
    }

    fn append_cookie(&self, headers: &mut HeaderMap, name: &str, value: &str, max_age_secs: u64) {
        let secure = if self.secure_cookies { "; Secure" } else { "" };
        let cookie = format!(
            "{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}{secure}"
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}
