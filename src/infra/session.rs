//! Read-only access to the courier API credential.
//!
//! Obtaining and refreshing the token belongs to the login flow; the gateway
//! only reads whatever token is currently stored.

use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, warn};

use crate::util::persistence::KeyValueStore;

pub const TOKEN_KEY: &str = "sameday_token";
pub const TOKEN_EXPIRY_KEY: &str = "sameday_token_exp";

pub trait CredentialSource: Send + Sync {
    /// Current token, or `None` when the session is missing or expired.
    fn token(&self) -> Option<String>;
}

/// Fixed token, e.g. from the environment.
#[derive(Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialSource for StaticCredential {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticCredential([REDACTED])")
    }
}

/// Token persisted by the login flow in the key-value store.
#[derive(Clone)]
pub struct StoredSession {
    store: Arc<dyn KeyValueStore>,
}

impl StoredSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "failed to read session entry");
                None
            }
        }
    }
}

impl CredentialSource for StoredSession {
    fn token(&self) -> Option<String> {
        let token = self.read(TOKEN_KEY).filter(|t| !t.is_empty())?;
        if let Some(expiry) = self.read(TOKEN_EXPIRY_KEY).and_then(|raw| parse_expiry(&raw)) {
            if OffsetDateTime::now_utc() >= expiry {
                debug!("stored session token has expired");
                return None;
            }
        }
        Some(token)
    }
}

// Unparsable expiries never expire, matching how the login flow stores them.
fn parse_expiry(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed);
    }
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(raw, format)
        .map(PrimitiveDateTime::assume_utc)
        .ok()
}
