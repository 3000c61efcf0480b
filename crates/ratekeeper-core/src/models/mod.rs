//! Data models for price updates.
//!
//! Inputs arrive as strings and integers from the UI layer and are
//! validated into `PriceUpdate` before any request is built.

pub mod pricing;

pub use pricing::{parse_date, PriceUpdate, Rate, ValidationError, DATE_FORMAT};
