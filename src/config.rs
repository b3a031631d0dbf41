//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `SAMEDAY_API_BASE_URL` - courier API host (default: the demo environment).
//!   `/api` is appended when missing.
//! - `AWB_CONSOLE_TIMEZONE` - reference timezone for business days
//!   (default: `Europe/Bucharest`)
//! - `AWB_CONSOLE_DATA_DIR` - directory of the local store (default: the
//!   platform config directory)
//! - `AWB_CONSOLE_TOKEN` - fixed API token; otherwise the stored session is used
//! - `LOCKER_CLIENT_ID` - locker widget integrator id
//! - `LOCKER_API_USERNAME` - locker widget API username

use std::path::PathBuf;
use std::sync::Arc;

use jiff::tz::TimeZone;
use thiserror::Error;
use url::Url;

use crate::infra::{
    CredentialSource, LockerConfig, ResourceGateway, SamedayClient, SamedayError,
    StaticCredential, StoredSession,
};
use crate::util::persistence::{FileStore, KeyValueStore, StoreError};
use crate::util::time_window::DEFAULT_REFERENCE_TIMEZONE;

pub const DEFAULT_API_HOST: &str = "https://sameday-api.demo.zitec.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct ConsoleConfig {
    /// Courier API root, always ending in `/api/`.
    pub api_base_url: String,
    pub timezone_name: String,
    pub timezone: TimeZone,
    pub data_dir: Option<PathBuf>,
    pub token: Option<String>,
    pub locker: LockerConfig,
}

impl std::fmt::Debug for ConsoleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleConfig")
            .field("api_base_url", &self.api_base_url)
            .field("timezone", &self.timezone_name)
            .field("data_dir", &self.data_dir)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("locker", &self.locker)
            .finish()
    }
}

impl ConsoleConfig {
    /// Load configuration from the process environment and `.env`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a malformed URL or an unknown timezone.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_base_url = api_root(
            &non_empty("SAMEDAY_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
        )?;

        let timezone_name = non_empty("AWB_CONSOLE_TIMEZONE")
            .unwrap_or_else(|| DEFAULT_REFERENCE_TIMEZONE.to_string());
        let timezone = TimeZone::get(&timezone_name).map_err(|e| {
            ConfigError::InvalidEnvVar("AWB_CONSOLE_TIMEZONE".to_string(), e.to_string())
        })?;

        let mut locker = LockerConfig::default();
        if let Some(client_id) = non_empty("LOCKER_CLIENT_ID") {
            locker.client_id = client_id;
        }
        if let Some(username) = non_empty("LOCKER_API_USERNAME") {
            locker.api_username = username;
        }

        Ok(Self {
            api_base_url,
            timezone_name,
            timezone,
            data_dir: non_empty("AWB_CONSOLE_DATA_DIR").map(PathBuf::from),
            token: non_empty("AWB_CONSOLE_TOKEN"),
            locker,
        })
    }

    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>, StoreError> {
        let store = match &self.data_dir {
            Some(dir) => FileStore::open(dir)?,
            None => FileStore::open_default()?,
        };
        Ok(Arc::new(store))
    }

    pub fn credentials(&self, store: Arc<dyn KeyValueStore>) -> Arc<dyn CredentialSource> {
        match &self.token {
            Some(token) => Arc::new(StaticCredential::new(token.clone())),
            None => Arc::new(StoredSession::new(store)),
        }
    }

    pub fn gateway(&self, store: Arc<dyn KeyValueStore>) -> Result<ResourceGateway, SamedayError> {
        let remote =
            SamedayClient::with_base_url(&self.api_base_url, self.credentials(store.clone()))?;
        Ok(ResourceGateway::new(remote, store, self.timezone.clone()))
    }
}

fn api_root(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let root = if trimmed.ends_with("/api") {
        format!("{trimmed}/")
    } else {
        format!("{trimmed}/api/")
    };
    Url::parse(&root).map_err(|e| {
        ConfigError::InvalidEnvVar("SAMEDAY_API_BASE_URL".to_string(), e.to_string())
    })?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ConsoleConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_base_url, "https://sameday-api.demo.zitec.com/api/");
        assert_eq!(config.timezone_name, "Europe/Bucharest");
        assert_eq!(config.data_dir, None);
        assert_eq!(config.token, None);
        assert_eq!(config.locker, LockerConfig::default());
    }

    #[test]
    fn api_suffix_is_appended_once() {
        for raw in [
            "https://api.sameday.ro",
            "https://api.sameday.ro/",
            "https://api.sameday.ro/api",
            "https://api.sameday.ro/api/",
        ] {
            let config = config(&[("SAMEDAY_API_BASE_URL", raw)]).unwrap();
            assert_eq!(config.api_base_url, "https://api.sameday.ro/api/", "{raw}");
        }
    }

    #[test]
    fn overrides_are_applied() {
        let config = config(&[
            ("AWB_CONSOLE_TIMEZONE", "America/New_York"),
            ("AWB_CONSOLE_DATA_DIR", "/tmp/awb"),
            ("AWB_CONSOLE_TOKEN", "secret"),
            ("LOCKER_CLIENT_ID", "client-42"),
            ("LOCKER_API_USERNAME", "integrator"),
        ])
        .unwrap();
        assert_eq!(config.timezone_name, "America/New_York");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/awb")));
        assert_eq!(config.locker.client_id, "client-42");
        assert_eq!(config.locker.api_username, "integrator");
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("AWB_CONSOLE_TIMEZONE", "Mars/Olympus_Mons")]),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "AWB_CONSOLE_TIMEZONE"
        ));
        assert!(matches!(
            config(&[("SAMEDAY_API_BASE_URL", "not a url")]),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "SAMEDAY_API_BASE_URL"
        ));
    }

    #[test]
    fn stored_session_is_used_without_a_fixed_token() {
        let store: Arc<dyn KeyValueStore> = Arc::new(crate::util::persistence::MemoryStore::new());
        store.set(crate::infra::session::TOKEN_KEY, "from-login").unwrap();

        let credentials = config(&[]).unwrap().credentials(store.clone());
        assert_eq!(credentials.token().as_deref(), Some("from-login"));

        let fixed = config(&[("AWB_CONSOLE_TOKEN", "env")]).unwrap().credentials(store);
        assert_eq!(fixed.token().as_deref(), Some("env"));
    }
}
