//! Fulfillment error types.

use std::time::Duration;

use common::OrderId;
use inventory_store::StoreError;
use thiserror::Error;

/// Errors that can occur while fulfilling an order.
///
/// Whatever the variant, the store is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// A constraint rejected one of the updates, typically an item running
    /// out of stock.
    #[error("Order {order_id} cannot be fulfilled: {source}")]
    IntegrityViolation {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The order was shipped before.
    #[error("Order already shipped: {0}")]
    AlreadyShipped(OrderId),

    /// The store could not be reached.
    #[error("Connection failure while fulfilling order {order_id}: {source}")]
    ConnectionFailure {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },

    /// The caller's deadline passed before the transaction committed.
    #[error("Fulfillment of order {order_id} timed out after {after:?}")]
    TimedOut { order_id: OrderId, after: Duration },

    /// Any other store error.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl FulfillmentError {
    /// Classifies a store error raised while shipping `order_id`.
    pub fn from_store(order_id: OrderId, err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => Self::NotFound(id),
            StoreError::AlreadyShipped(id) => Self::AlreadyShipped(id),
            err if err.is_integrity_violation() => Self::IntegrityViolation {
                order_id,
                source: err,
            },
            err if err.is_connection_failure() => Self::ConnectionFailure {
                order_id,
                source: err,
            },
            err => Self::Store(err),
        }
    }

    /// Short label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::IntegrityViolation { .. } => "integrity_violation",
            Self::NotFound(_) => "not_found",
            Self::AlreadyShipped(_) => "already_shipped",
            Self::ConnectionFailure { .. } => "connection_failure",
            Self::TimedOut { .. } => "timed_out",
            Self::Store(_) => "store",
        }
    }

    /// Name of the violated constraint, if that is why fulfillment failed.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::IntegrityViolation { source, .. } => source.constraint(),
            _ => None,
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
