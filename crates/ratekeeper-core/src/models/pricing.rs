use std::fmt;
use std::num::NonZeroU32;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Wire format for dates sent to the pricing API (`yyyy-MM-dd`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a valid date (got {0:?})")]
    InvalidDate(String),

    #[error("Please enter a valid price greater than 0 (got {0})")]
    NonPositiveRate(i64),

    #[error("Price {0} is too large")]
    RateTooLarge(i64),

    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Nightly price, a positive whole currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rate(NonZeroU32);

impl Rate {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::NonPositiveRate(value));
        }
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Rate)
            .ok_or(ValidationError::RateTooLarge(value))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a `yyyy-MM-dd` calendar date, rejecting impossible dates like Feb 30.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}

/// A validated price change for the configured property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceUpdate {
    Single {
        date: NaiveDate,
        rate: Rate,
    },
    Range {
        start_date: NaiveDate,
        end_date: NaiveDate,
        rate: Rate,
    },
}

impl PriceUpdate {
    pub fn single(date: &str, rate: i64) -> Result<Self, ValidationError> {
        let date = parse_date(date)?;
        let rate = Rate::new(rate)?;
        Ok(PriceUpdate::Single { date, rate })
    }

    pub fn range(start: &str, end: &str, rate: i64) -> Result<Self, ValidationError> {
        let start_date = parse_date(start)?;
        let end_date = parse_date(end)?;
        if end_date < start_date {
            return Err(ValidationError::EndBeforeStart {
                start: start_date,
                end: end_date,
            });
        }
        let rate = Rate::new(rate)?;
        Ok(PriceUpdate::Range {
            start_date,
            end_date,
            rate,
        })
    }

    pub fn rate(&self) -> Rate {
        match self {
            PriceUpdate::Single { rate, .. } | PriceUpdate::Range { rate, .. } => *rate,
        }
    }

    /// Number of nights the update covers, counting both ends of a range.
    pub fn nights(&self) -> i64 {
        match self {
            PriceUpdate::Single { .. } => 1,
            PriceUpdate::Range {
                start_date,
                end_date,
                ..
            } => (*end_date - *start_date).num_days() + 1,
        }
    }

    /// API path this update is posted to.
    pub fn path(&self) -> &'static str {
        match self {
            PriceUpdate::Single { .. } => "/properties/update-rate-single-date",
            PriceUpdate::Range { .. } => "/properties/update-rate-multiple-dates",
        }
    }

    /// JSON body for the pricing endpoint.
    pub fn to_body(&self, property_id: &str) -> serde_json::Value {
        match *self {
            PriceUpdate::Single { date, rate } => serde_json::to_value(SingleDateBody {
                property_id,
                date: date.format(DATE_FORMAT).to_string(),
                new_rate: rate,
            }),
            PriceUpdate::Range {
                start_date,
                end_date,
                rate,
            } => serde_json::to_value(DateRangeBody {
                property_id,
                start_date: start_date.format(DATE_FORMAT).to_string(),
                end_date: end_date.format(DATE_FORMAT).to_string(),
                new_rate: rate,
            }),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleDateBody<'a> {
    property_id: &'a str,
    date: String,
    new_rate: Rate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRangeBody<'a> {
    property_id: &'a str,
    start_date: String,
    end_date: String,
    new_rate: Rate,
}
