use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::storage::{MemoryBackend, SessionBackend};

/// Default session lifetime in days.
/// Matches the identity provider's default session max age.
pub const DEFAULT_SESSION_MAX_AGE_DAYS: i64 = 30;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub tokens: TokenPair,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl SessionData {
    pub fn new(tokens: TokenPair, email: impl Into<String>) -> Self {
        Self {
            tokens,
            email: email.into(),
            first_name: None,
            last_name: None,
            created_at: Utc::now(),
            refreshed_at: None,
        }
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        Utc::now() > self.created_at + max_age
    }

    /// "First Last", falling back to the email when the name is unknown
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// Shared holder of the current token pair.
///
/// Reads and writes go through an `RwLock`, so a reader either sees the old
/// access token or the new one, never a mix. A write is visible to every read
/// that starts after `set_access_token` returns. Share it between clients
/// with `Arc<SessionStore>`.
///
/// Mutations keep the write guard while they touch the backend, so storage
/// always ends up in the same order as memory.
pub struct SessionStore {
    data: RwLock<Option<SessionData>>,
    backend: Box<dyn SessionBackend>,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(backend: Box<dyn SessionBackend>) -> Self {
        Self {
            data: RwLock::new(None),
            backend,
            max_age: Duration::days(DEFAULT_SESSION_MAX_AGE_DAYS),
        }
    }

    /// A store that keeps the session in memory only
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::default()))
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<SessionData>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<SessionData>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a persisted session. Returns true if a live session was restored.
    pub fn load(&self) -> Result<bool> {
        match self.backend.load()? {
            Some(data) if !data.is_expired(self.max_age) => {
                debug!(email = %data.email, "Restored persisted session");
                *self.write() = Some(data);
                Ok(true)
            }
            Some(data) => {
                info!(email = %data.email, "Persisted session has expired, discarding");
                self.backend.clear()?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Install a freshly issued session and persist it.
    pub fn establish(&self, data: SessionData) -> Result<()> {
        let mut guard = self.write();
        self.backend.save(&data)?;
        *guard = Some(data);
        Ok(())
    }

    /// End the session, in memory and in storage
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.write();
        *guard = None;
        self.backend.clear()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|d| d.tokens.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().as_ref().map(|d| d.tokens.refresh_token.clone())
    }

    /// Replace the access token after a refresh.
    ///
    /// The in-memory value is authoritative; a persistence failure is logged
    /// and does not undo the update.
    pub fn set_access_token(&self, token: String) {
        let mut guard = self.write();
        let Some(data) = guard.as_mut() else {
            debug!("Ignoring access token update with no active session");
            return;
        };
        data.tokens.access_token = token;
        data.refreshed_at = Some(Utc::now());

        if let Err(e) = self.backend.save(data) {
            warn!(error = %e, "Failed to persist refreshed access token");
        }
    }

    /// True if a session exists and has not outlived its max age
    pub fn is_authenticated(&self) -> bool {
        self.read()
            .as_ref()
            .map(|d| !d.is_expired(self.max_age))
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> Option<SessionData> {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::FileBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex};
    use std::time::Duration as StdDuration;

    fn session(access: &str, refresh: &str) -> SessionData {
        SessionData::new(
            TokenPair {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
            },
            "host@example.com",
        )
    }

    #[test]
    fn test_empty_store_reads_absent() {
        let store = SessionStore::in_memory();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(!store.is_authenticated());

        // No session to update, so nothing appears
        store.set_access_token("orphan".to_string());
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn test_set_access_token_visible_to_later_reads() {
        let store = SessionStore::in_memory();
        store.establish(session("old", "refresh")).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("old"));

        store.set_access_token("new".to_string());
        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh"));
        assert!(store.snapshot().unwrap().refreshed_at.is_some());
    }

    #[test]
    fn test_no_torn_reads_across_threads() {
        let store = Arc::new(SessionStore::in_memory());
        store.establish(session(&"a".repeat(64), "refresh")).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..500 {
                    let c = if i % 2 == 0 { "b" } else { "a" };
                    store.set_access_token(c.repeat(64));
                }
            })
        };

        for _ in 0..500 {
            let token = store.access_token().unwrap();
            assert!(token == "a".repeat(64) || token == "b".repeat(64));
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_persisted_session_survives_reload() {
        let dir = tempfile::tempdir().unwrap();

        let store = SessionStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        store.establish(session("access", "refresh")).unwrap();
        store.set_access_token("rotated".to_string());

        let reloaded = SessionStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.access_token().as_deref(), Some("rotated"));
        assert_eq!(reloaded.refresh_token().as_deref(), Some("refresh"));
    }

    #[test]
    fn test_expired_session_discarded_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());

        let mut stale = session("access", "refresh");
        stale.created_at = Utc::now() - Duration::days(DEFAULT_SESSION_MAX_AGE_DAYS + 1);
        backend.save(&stale).unwrap();

        let store = SessionStore::new(Box::new(backend));
        assert!(!store.load().unwrap());
        assert_eq!(store.access_token(), None);
        assert!(!dir.path().join("session.json").exists());
    }

    #[test]
    fn test_clear_removes_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        store.establish(session("access", "refresh")).unwrap();
        assert!(store.is_authenticated());

        store.clear().unwrap();
        assert!(!store.is_authenticated());
        assert!(!dir.path().join("session.json").exists());
    }

    /// Memory backend whose second save parks until released
    struct GatedBackend {
        stored: Arc<MemoryBackend>,
        saves: AtomicUsize,
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl SessionBackend for GatedBackend {
        fn load(&self) -> Result<Option<SessionData>> {
            self.stored.load()
        }

        fn save(&self, data: &SessionData) -> Result<()> {
            if self.saves.fetch_add(1, Ordering::SeqCst) == 1 {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            self.stored.save(data)
        }

        fn clear(&self) -> Result<()> {
            self.stored.clear()
        }
    }

    #[test]
    fn test_logout_during_refresh_persist_stays_logged_out() {
        let stored = Arc::new(MemoryBackend::default());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(SessionStore::new(Box::new(GatedBackend {
            stored: Arc::clone(&stored),
            saves: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        })));
        store.establish(session("access", "refresh")).unwrap();

        let refresher = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.set_access_token("refreshed".to_string()))
        };
        // Refresh is now inside the backend save
        entered_rx.recv().unwrap();

        let logout = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.clear().unwrap())
        };
        std::thread::sleep(StdDuration::from_millis(50));
        release_tx.send(()).unwrap();

        refresher.join().unwrap();
        logout.join().unwrap();

        assert_eq!(store.access_token(), None);
        assert_eq!(stored.load().unwrap(), None);
    }

    #[test]
    fn test_display_name() {
        let mut data = session("a", "r");
        assert_eq!(data.display_name(), "host@example.com");
        data.first_name = Some("Ada".to_string());
        data.last_name = Some("Lovelace".to_string());
        assert_eq!(data.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let debug = format!("{:?}", session("secret-access", "secret-refresh"));
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }
}
