//! Route handlers and the state they share.

pub mod customers;
pub mod health;
pub mod items;
pub mod metrics;
pub mod orders;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use fulfillment::FulfillmentService;
use inventory_store::InventoryStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: InventoryStore> {
    pub store: S,
    pub fulfillment: FulfillmentService<S>,
}

impl<S: InventoryStore + Clone> AppState<S> {
    pub fn new(store: S, fulfill_timeout: Option<Duration>) -> Self {
        let mut fulfillment = FulfillmentService::new(store.clone());
        if let Some(timeout) = fulfill_timeout {
            fulfillment = fulfillment.with_timeout(timeout);
        }
        Self { store, fulfillment }
    }
}

/// Parses a numeric path segment into a typed id.
fn parse_id<T: FromStr<Err = std::num::ParseIntError>>(raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
