//! Price update operations for the configured property.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, ApiRequest, ReqwestTransport, Transport};
use crate::models::{PriceUpdate, ValidationError};
use crate::notify::{Notice, Notifier};

const SINGLE_SUCCESS: &str = "Price updated successfully!";
const SINGLE_FAILURE: &str = "Failed to update price. Please try again.";
const RANGE_SUCCESS: &str = "Prices updated successfully!";
const RANGE_FAILURE: &str = "Failed to update prices. Please try again.";

pub struct PricingService<T: Transport = ReqwestTransport> {
    client: ApiClient<T>,
    property_id: String,
    notifier: Arc<dyn Notifier>,
    deadline: Option<Duration>,
}

impl<T: Transport> PricingService<T> {
    pub fn new(client: ApiClient<T>, property_id: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            property_id: property_id.into(),
            notifier,
            deadline: None,
        }
    }

    /// Bound each operation, refresh and retry included, by `deadline`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    /// Set the nightly rate for one date (`yyyy-MM-dd`).
    pub async fn update_single_date_price(&self, date: &str, rate: i64) -> Result<Value, ApiError> {
        let update = PriceUpdate::single(date, rate).map_err(|e| self.reject(e))?;
        self.apply(update).await
    }

    /// Set the nightly rate for every date from `start` to `end`, both included.
    pub async fn update_range_price(&self, start: &str, end: &str, rate: i64) -> Result<Value, ApiError> {
        let update = PriceUpdate::range(start, end, rate).map_err(|e| self.reject(e))?;
        self.apply(update).await
    }

    /// Send an already validated update
    pub async fn apply(&self, update: PriceUpdate) -> Result<Value, ApiError> {
        let (success, failure) = match update {
            PriceUpdate::Single { .. } => (SINGLE_SUCCESS, SINGLE_FAILURE),
            PriceUpdate::Range { .. } => (RANGE_SUCCESS, RANGE_FAILURE),
        };

        let request = ApiRequest::post(update.path(), Some(update.to_body(&self.property_id)));
        info!(
            property_id = %self.property_id,
            nights = update.nights(),
            rate = update.rate().get(),
            "Sending price update"
        );

        let result = match self.deadline {
            Some(deadline) => self.client.send_within(&request, deadline).await,
            None => self.client.send(&request).await,
        };

        match result {
            Ok(payload) => {
                self.notifier.notify(Notice::success(success));
                Ok(payload)
            }
            Err(e) => {
                debug!(error = %e, "Price update failed");
                self.notifier.notify(Notice::error(e.user_message(failure)));
                Err(e)
            }
        }
    }

    fn reject(&self, error: ValidationError) -> ApiError {
        self.notifier.notify(Notice::error(error.to_string()));
        ApiError::Validation(error)
    }
}
