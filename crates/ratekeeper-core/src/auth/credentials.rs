use std::fmt;

use serde_json::{json, Value};

/// Login credentials. Held only for the duration of a login call and never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields must be non-blank before a login is attempted.
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    /// Body for the login endpoint
    pub fn to_login_body(&self) -> Value {
        json!({ "email": self.email.trim(), "password": self.password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("host@example.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("host@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_is_complete() {
        assert!(Credentials::new("a@b.c", "pw").is_complete());
        assert!(!Credentials::new("  ", "pw").is_complete());
        assert!(!Credentials::new("a@b.c", "").is_complete());
    }

    #[test]
    fn test_serializes_login_body() {
        let body = Credentials::new(" a@b.c ", "pw").to_login_body();
        assert_eq!(body, json!({ "email": "a@b.c", "password": "pw" }));
    }
}
