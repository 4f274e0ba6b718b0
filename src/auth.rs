use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Principal, Session, SessionContext};
use crate::store::SessionStore;
use crate::{Error, Result};

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        Ok(password_hash)
    }

    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| Error::Internal(format!("Invalid password hash: {}", e)))?;

        let argon2 = Argon2::default();

        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    pub fn generate_session_token() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Decides whether a request may mutate anything.
#[async_trait]
pub trait IdentityGate: Send + Sync {
    async fn require_session(&self, ctx: &SessionContext) -> Result<Principal>;
}

/// The single admin account allowed to sign in.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub email: String,
    /// Argon2 PHC string. `None` disables login entirely.
    pub password_hash: Option<String>,
}

/// Session-backed gate: issues sessions on login and checks them on every mutation.
pub struct SessionGate {
    sessions: Arc<dyn SessionStore>,
    admin: AdminAccount,
    ttl: Duration,
}

impl SessionGate {
    pub fn new(sessions: Arc<dyn SessionStore>, admin: AdminAccount, ttl: Duration) -> Self {
        Self {
            sessions,
            admin,
            ttl,
        }
    }

    /// Checks the admin credentials and returns a fresh session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let Some(hash) = self.admin.password_hash.as_deref() else {
            tracing::warn!("Login attempted but no admin password is configured");
            return Err(Error::Unauthorized);
        };

        let email_matches = email.trim().eq_ignore_ascii_case(&self.admin.email);
        if !email_matches || !AuthService::verify_password(password, hash)? {
            tracing::warn!("Rejected login for {}", email);
            return Err(Error::Unauthorized);
        }

        let now = Utc::now();
        let session = Session {
            token: AuthService::generate_session_token(),
            email: self.admin.email.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        let token = session.token.clone();
        self.sessions.create(session).await?;

        tracing::info!("Admin {} signed in", self.admin.email);
        Ok(token)
    }

    pub async fn logout(&self, ctx: &SessionContext) -> Result<()> {
        self.require_session(ctx).await?;
        if let Some(token) = &ctx.token {
            self.sessions.delete(token).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityGate for SessionGate {
    async fn require_session(&self, ctx: &SessionContext) -> Result<Principal> {
        let Some(token) = ctx.token.as_deref() else {
            tracing::warn!("Rejected request without a session");
            return Err(Error::Unauthorized);
        };

        let Some(session) = self.sessions.find(token).await? else {
            tracing::warn!("Rejected request with an unknown session");
            return Err(Error::Unauthorized);
        };

        if session.is_expired(Utc::now()) {
            tracing::warn!("Rejected request with an expired session");
            self.sessions.delete(token).await?;
            return Err(Error::Unauthorized);
        }

        Ok(Principal {
            email: session.email,
        })
    }
}
