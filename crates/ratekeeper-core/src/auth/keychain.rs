use anyhow::{Context, Result};
use keyring::Entry;

use super::session::SessionData;
use super::storage::SessionBackend;

const SERVICE_NAME: &str = "ratekeeper";

/// Keychain account the session is stored under
const SESSION_ACCOUNT: &str = "session";

/// Stores the session as JSON in the OS keychain.
pub struct KeyringBackend {
    account: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            account: SESSION_ACCOUNT.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for KeyringBackend {
    fn load(&self) -> Result<Option<SessionData>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let data = serde_json::from_str(&json).context("Failed to parse keychain session")?;
                Ok(Some(data))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn save(&self, data: &SessionData) -> Result<()> {
        let json = serde_json::to_string(data)?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store session in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}
