//! API client for the pricing backend.
//!
//! `ApiClient::send` decorates a `Transport` with bearer-token injection and a
//! single refresh-and-retry cycle when the backend answers 401.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{Credentials, SessionData, SessionStore, TokenPair};

use super::transport::{ApiRequest, HttpResponse, ReqwestTransport, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";

const REFRESH_PATH: &str = "/auth/refresh-token";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Per-call state. Each logical request owns one, so concurrent calls never
/// share retry state.
#[derive(Debug, Default)]
struct RequestContext {
    /// Set once the single refresh-and-retry cycle has been spent
    retried: bool,
}

/// API client for the pricing backend.
/// Clone is cheap - the transport pools connections and the session is shared.
#[derive(Clone)]
pub struct ApiClient<T: Transport = ReqwestTransport> {
    transport: T,
    session: Arc<SessionStore>,
}

impl ApiClient<ReqwestTransport> {
    /// Create a client talking to `base_url` over HTTP
    pub fn new(base_url: &str, timeout: Duration, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(base_url, timeout)?;
        Ok(Self::with_transport(transport, session))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    /// Authenticate and install the new session in the store
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionData, ApiError> {
        if !credentials.is_complete() {
            return Err(ApiError::LoginFailed("Email and password are required".to_string()));
        }

        let request = ApiRequest::post(LOGIN_PATH, Some(credentials.to_login_body()));
        let response = self.transport.execute(&request, None).await?;

        if !response.status.is_success() {
            info!(status = %response.status, "Login rejected");
            return Err(ApiError::LoginFailed("Invalid email or password".to_string()));
        }

        let auth: LoginResponse = response.json()?;
        let data = SessionData {
            tokens: TokenPair {
                access_token: auth.access_token,
                refresh_token: auth.refresh_token,
            },
            email: credentials.email.trim().to_string(),
            first_name: auth.first_name,
            last_name: auth.last_name,
            created_at: Utc::now(),
            refreshed_at: None,
        };

        self.session
            .establish(data.clone())
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        info!(email = %data.email, "Logged in");
        Ok(data)
    }

    /// End the current session
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session
            .clear()
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        info!("Logged out");
        Ok(())
    }

    /// Send an authenticated request and return the decoded payload.
    ///
    /// A 401 on the first attempt triggers one token refresh and one resend.
    /// A 401 on the resend is final.
    pub async fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let mut ctx = RequestContext::default();

        loop {
            let token = self.session.access_token();
            if token.is_none() {
                debug!(path = %request.path, "No access token, sending unauthenticated");
            }

            let response = self.transport.execute(request, token.as_deref()).await?;

            if response.status != StatusCode::UNAUTHORIZED {
                return Self::into_payload(response);
            }

            if ctx.retried {
                debug!(path = %request.path, "Still unauthorized after token refresh");
                return Err(ApiError::Unauthorized);
            }

            info!(path = %request.path, "Access token rejected, refreshing");
            self.refresh_for_retry().await?;
            ctx.retried = true;
        }
    }

    /// `send` bounded by a caller-imposed deadline.
    ///
    /// On timeout the call is dropped; the session store is only touched if a
    /// refresh had already completed.
    pub async fn send_within(&self, request: &ApiRequest, timeout: Duration) -> Result<Value, ApiError> {
        tokio::time::timeout(timeout, self.send(request))
            .await
            .map_err(|_| ApiError::TimedOut)?
    }

    async fn refresh_for_retry(&self) -> Result<(), ApiError> {
        match self.refresh_access_token().await {
            Ok(()) => Ok(()),
            Err(ApiError::NoRefreshToken) => {
                debug!("Unauthorized and no refresh token available");
                Err(ApiError::NoRefreshToken)
            }
            Err(e) => {
                info!(error = %e, "Token refresh failed");
                Err(ApiError::RefreshFailed(Box::new(e)))
            }
        }
    }

    /// Exchange the refresh token for a new access token and store it
    async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let refresh_token = self.session.refresh_token().ok_or(ApiError::NoRefreshToken)?;

        let request = ApiRequest::post(REFRESH_PATH, None);
        let response = self.transport.execute(&request, Some(&refresh_token)).await?;
        let response = Self::check_response(response)?;

        let refreshed: RefreshResponse = response.json()?;
        self.session.set_access_token(refreshed.access_token);
        debug!("Access token refreshed");
        Ok(())
    }

    /// Check if response is successful, returning an error with body if not.
    fn check_response(response: HttpResponse) -> Result<HttpResponse, ApiError> {
        if response.status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status, &response.body))
        }
    }

    /// Decode a terminal response into its payload or error
    fn into_payload(response: HttpResponse) -> Result<Value, ApiError> {
        let response = Self::check_response(response)?;

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let payload = serde_json::from_str(&response.body)
            .unwrap_or_else(|_| Value::String(response.body.clone()));

        match backend_error(&payload) {
            Some(message) => Err(ApiError::Backend(message)),
            None => Ok(payload),
        }
    }
}

#[cfg(test)]
impl ApiClient<super::transport::mock::MockTransport> {
    pub(crate) fn transport_requests(&self) -> Vec<super::transport::mock::RecordedRequest> {
        self.transport.requests()
    }
}

/// Application error wrapped in a 2xx body: `"success": false` or a string `"error"`.
fn backend_error(payload: &Value) -> Option<String> {
    let obj = payload.as_object()?;
    let failed = obj.get("success").and_then(Value::as_bool) == Some(false);
    let error = obj.get("error").and_then(Value::as_str);

    if !failed && error.is_none() {
        return None;
    }
    let message = obj
        .get("message")
        .and_then(Value::as_str)
        .or(error)
        .unwrap_or("The server rejected the request");
    Some(message.to_string())
}
