//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the pricing API base URL, the property identifier and the
//! last used email.
//!
//! Configuration is stored at `~/.config/ratekeeper/config.json`. The
//! `RATEKEEPER_API_BASE_URL` and `RATEKEEPER_PROPERTY_ID` environment
//! variables take precedence over the file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::auth::{FileBackend, KeyringBackend, SessionBackend, DEFAULT_SESSION_MAX_AGE_DAYS};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "ratekeeper";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_BASE_URL: &str = "RATEKEEPER_API_BASE_URL";
pub const ENV_PROPERTY_ID: &str = "RATEKEEPER_PROPERTY_ID";

/// Where the session is persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackendKind {
    #[default]
    File,
    Keyring,
}

impl FromStr for SessionBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" | "keychain" => Ok(Self::Keyring),
            other => bail!("Unknown session backend '{}' (expected 'file' or 'keyring')", other),
        }
    }
}

impl fmt::Display for SessionBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Keyring => write!(f, "keyring"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub property_id: Option<String>,
    pub last_email: Option<String>,
    pub session_backend: SessionBackendKind,
    pub request_timeout_secs: u64,
    pub session_max_age_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            property_id: None,
            last_email: None,
            session_backend: SessionBackendKind::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            session_max_age_days: DEFAULT_SESSION_MAX_AGE_DAYS,
        }
    }
}

impl Config {
    /// Load from the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load the config file alone, as it should be saved back
    pub fn load_file() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Overlay values from `lookup` (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_API_BASE_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(id) = non_empty(ENV_PROPERTY_ID) {
            self.property_id = Some(id);
        }
    }

    /// Set a config value by its key name
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_base_url" => self.api_base_url = Some(value.trim_end_matches('/').to_string()),
            "property_id" => self.property_id = Some(value.to_string()),
            "last_email" => self.last_email = Some(value.to_string()),
            "session_backend" => self.session_backend = value.parse()?,
            "request_timeout_secs" => {
                let secs: u64 = value.parse()?;
                if secs == 0 {
                    bail!("request_timeout_secs must be greater than 0");
                }
                self.request_timeout_secs = secs;
            }
            "session_max_age_days" => {
                let days: i64 = value.parse()?;
                if days <= 0 {
                    bail!("session_max_age_days must be greater than 0");
                }
                self.session_max_age_days = days;
            }
            other => bail!("Unknown config key '{}'", other),
        }
        Ok(())
    }

    pub fn api_base_url(&self) -> Result<&str> {
        match self.api_base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => bail!(
                "API base URL is not configured. Set {} or run `ratekeeper config set api_base_url <url>`",
                ENV_API_BASE_URL
            ),
        }
    }

    pub fn property_id(&self) -> Result<&str> {
        match self.property_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => bail!(
                "Property ID is not configured. Set {} or run `ratekeeper config set property_id <id>`",
                ENV_PROPERTY_ID
            ),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn session_max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_max_age_days.max(1))
    }

    /// Session persistence backend selected by this config
    pub fn session_backend(&self) -> Result<Box<dyn SessionBackend>> {
        Ok(match self.session_backend {
            SessionBackendKind::File => Box::new(FileBackend::new(self.cache_dir()?)),
            SessionBackendKind::Keyring => Box::new(KeyringBackend::new()),
        })
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.set("api_base_url", "https://api.example.com/").unwrap();
        config.set("property_id", "prop-7").unwrap();
        config.set("session_backend", "keyring").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(loaded.property_id.as_deref(), Some("prop-7"));
        assert_eq!(loaded.session_backend, SessionBackendKind::Keyring);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "property_id": "p1" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.property_id.as_deref(), Some("p1"));
        assert_eq!(config.session_max_age_days, DEFAULT_SESSION_MAX_AGE_DAYS);
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = Config {
            api_base_url: Some("https://file.example.com".to_string()),
            property_id: Some("file-prop".to_string()),
            ..Config::default()
        };
        config.apply_overrides(|key| match key {
            ENV_API_BASE_URL => Some("https://env.example.com".to_string()),
            ENV_PROPERTY_ID => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.api_base_url().unwrap(), "https://env.example.com");
        // Blank env values do not clobber the file
        assert_eq!(config.property_id().unwrap(), "file-prop");
    }

    #[test]
    fn test_missing_required_values_error() {
        let config = Config::default();
        assert!(config.api_base_url().is_err());
        assert!(config.property_id().is_err());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("request_timeout_secs", "0").is_err());
        assert!(config.set("request_timeout_secs", "abc").is_err());
        assert!(config.set("session_max_age_days", "-1").is_err());
        assert!(config.set("session_backend", "floppy").is_err());
        assert!(config.set("no_such_key", "x").is_err());

        config.set("request_timeout_secs", "5").unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }
}
