//! Utility functions for display formatting.

pub mod format;

pub use format::{describe_update, format_date, format_date_short};
