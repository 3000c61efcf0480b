//! Ratekeeper core - session handling and authenticated pricing API access.
//!
//! The pieces fit together like this:
//!
//! - [`auth::SessionStore`] holds the current access/refresh token pair and
//!   persists it through a [`auth::SessionBackend`].
//! - [`api::ApiClient`] attaches the access token to every request and, on a
//!   401, refreshes it once and retries the request once.
//! - [`pricing::PricingService`] validates price updates and sends them,
//!   reporting outcomes through a [`notify::Notifier`].

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;
pub mod pricing;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{Credentials, SessionStore};
pub use config::Config;
pub use pricing::PricingService;
