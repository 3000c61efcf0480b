use thiserror::Error;

use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Unauthenticated - no refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] Box<ApiError>),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Request timed out")]
    TimedOut,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Backend rejected the request: {0}")]
    Backend(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the session can no longer be recovered and the user has to log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::NoRefreshToken | ApiError::RefreshFailed(_))
    }

    /// Message suitable for showing to the user after a failed price update.
    ///
    /// `action_failed` is the generic text used for transport failures.
    pub fn user_message(&self, action_failed: &str) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::Backend(message) => message.clone(),
            e if e.is_auth_expired() => SESSION_EXPIRED_MESSAGE.to_string(),
            _ => action_failed.to_string(),
        }
    }
}

/// Notice shown when the session cannot be refreshed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, "no"), ApiError::AccessDenied(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_REQUEST, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));

        // Multi-byte characters straddling the limit must not panic
        let accented = "é".repeat(300);
        assert!(ApiError::truncate_body(&accented).contains("truncated"));
    }

    #[test]
    fn test_auth_expired_classification() {
        assert!(ApiError::NoRefreshToken.is_auth_expired());
        assert!(ApiError::RefreshFailed(Box::new(ApiError::Unauthorized)).is_auth_expired());
        assert!(!ApiError::Unauthorized.is_auth_expired());
        assert!(!ApiError::TimedOut.is_auth_expired());
    }

    #[test]
    fn test_user_message() {
        let generic = "Failed to update price. Please try again.";
        assert_eq!(ApiError::NoRefreshToken.user_message(generic), SESSION_EXPIRED_MESSAGE);
        assert_eq!(ApiError::Backend("Property is locked".into()).user_message(generic), "Property is locked");
        assert_eq!(ApiError::RateLimited.user_message(generic), generic);
        assert_eq!(
            ApiError::Validation(ValidationError::NonPositiveRate(0)).user_message(generic),
            "Please enter a valid price greater than 0 (got 0)"
        );
    }
}
