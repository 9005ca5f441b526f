//! Application state management

use crate::auth::{AuthService, SessionTransport, TokenIssuer};
use eventline_core::{AppConfig, IdentityStore, Mailer};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Secrets and lifetimes are read once from configuration at construction;
/// every component holds its own immutable copy for the process lifetime.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Authentication service
    pub auth: AuthService,
    /// Token pair issuance and verification
    pub issuer: TokenIssuer,
    /// Token transport over headers and cookies
    pub transport: SessionTransport,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create application state with the given collaborators
    pub fn new(
        config: AppConfig,
        store: Arc<dyn IdentityStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let issuer = TokenIssuer::from_config(&config.auth);
        let transport = SessionTransport::from_config(&config.auth);
        let auth = AuthService::new(store, mailer, issuer.clone());

        Self {
            config,
            auth,
            issuer,
            transport,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryIdentityStore, LogMailer};

    #[test]
    fn test_request_counter() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(InMemoryIdentityStore::new()),
            Arc::new(LogMailer),
        );

        assert_eq!(state.get_request_count(), 0);
        state.increment_requests();
        state.increment_requests();
        assert_eq!(state.get_request_count(), 2);
        assert!(state.is_ready());
    }
}
