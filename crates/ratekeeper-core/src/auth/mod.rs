//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `SessionStore`: the shared holder of the current access/refresh tokens
//! - `SessionBackend`: where a session is persisted between runs (file, keychain, memory)
//! - `Credentials`: transient login input
//!
//! Sessions are discarded on load once they are older than the configured max age.

pub mod credentials;
pub mod keychain;
pub mod session;
pub mod storage;

pub use keychain::KeyringBackend;
pub use credentials::Credentials;
pub use session::{SessionData, SessionStore, TokenPair, DEFAULT_SESSION_MAX_AGE_DAYS};
pub use storage::{FileBackend, MemoryBackend, SessionBackend};
