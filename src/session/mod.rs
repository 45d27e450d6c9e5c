//! Persistent login state: tokens, role and profile.
//!
//! Every command reads the session through [`Session`] instead of touching
//! storage directly. Storage itself is behind [`SessionStore`] so the CLI can
//! persist to a JSON file while tests keep everything in memory.

mod claims;
mod store;

pub use claims::TokenClaims;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::models::UserProfile;
use crate::types::Role;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("HOME environment variable not set")]
    NoHome,

    #[error("session store lock poisoned")]
    Poisoned,
}

/// Everything kept between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub role: Option<Role>,
    pub user: Option<UserProfile>,
    pub signed_in_at: Option<DateTime<Utc>>,
}

/// Tokens and profile handed back by a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub user: UserProfile,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Explicit session context passed to whatever needs to authenticate
pub struct Session {
    store: Arc<dyn SessionStore>,
    data: SessionData,
}

impl Session {
    pub fn open(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        let data = store.load()?;
        Ok(Self { store, data })
    }

    /// Session with nothing persisted, for one-off tooling and tests
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemorySessionStore::default()),
            data: SessionData::default(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.data.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.data.refresh_token.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.data.role
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.data.user.as_ref()
    }

    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.data.signed_in_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.access_token.is_some()
    }

    /// Store a fresh login and persist it
    pub fn sign_in(&mut self, credentials: Credentials) -> Result<(), SessionError> {
        self.data = SessionData {
            role: Some(credentials.user.role),
            user: Some(credentials.user),
            access_token: Some(credentials.access_token),
            refresh_token: credentials.refresh_token,
            signed_in_at: Some(Utc::now()),
        };
        self.store.save(&self.data)?;
        tracing::info!(role = ?self.data.role, "session stored");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.data = SessionData::default();
        self.store.clear()?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// Claims read from the access token without verifying its signature
    pub fn claims(&self) -> Option<TokenClaims> {
        self.token().and_then(TokenClaims::peek)
    }

    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.claims().and_then(|c| c.expires_at())
    }

    pub fn is_expired(&self) -> bool {
        self.token_expiry().is_some_and(|exp| exp <= Utc::now())
    }
}
