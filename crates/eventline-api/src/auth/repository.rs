//! Development and test implementations of the identity collaborators
//!
//! Production deployments wire database-backed implementations of
//! `IdentityStore` and a real mail dispatcher; these in-process versions
//! keep the auth subsystem runnable and testable on their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventline_core::{EventlineError, IdentityStore, Mailer, NewUser, Result, User};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory identity store keyed by user ID
#[derive(Default)]
pub struct InMemoryIdentityStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(EventlineError::Conflict(format!(
                "Email already registered: {}",
                user.email
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            avatar_url: user.avatar_url,
            reset_token: None,
            reset_token_expires: None,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| EventlineError::NotFound(format!("User {id}")))?;

        user.reset_token = Some(token.to_string());
        user.reset_token_expires = Some(expires);

        Ok(())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| EventlineError::NotFound(format!("User {id}")))?;

        user.password_hash = password_hash.to_string();
        // A used reset token is single-shot
        user.reset_token = None;
        user.reset_token_expires = None;

        Ok(())
    }
}

/// Mail dispatcher that records sends in the application log
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, to: &str, name: &str) -> Result<()> {
        tracing::info!(to = %to, name = %name, "Dispatching welcome mail");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, name: &str, _token: &str) -> Result<()> {
        tracing::info!(to = %to, name = %name, "Dispatching password reset mail");
        Ok(())
    }
}
