//! REST API client module for the pricing backend.
//!
//! This module provides the `ApiClient` for authenticated calls to the
//! pricing API and the `Transport` seam it is built on.
//!
//! The API uses bearer token authentication. Access tokens are obtained at
//! login and renewed through the refresh-token endpoint when they expire.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, SESSION_EXPIRED_MESSAGE};
pub use transport::{ApiRequest, HttpResponse, ReqwestTransport, Transport};
