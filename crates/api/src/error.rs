//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;
use inventory_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Store operation error.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Order fulfillment error.
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(err) => store_status(err),
            ApiError::Fulfillment(err) => fulfillment_status(err),
        }
    }

    fn constraint(&self) -> Option<&str> {
        match self {
            ApiError::Store(err) => err.constraint(),
            ApiError::Fulfillment(err) => err.constraint(),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let Some(constraint) = self.constraint() {
            body["constraint"] = serde_json::Value::from(constraint);
        }
        (status, axum::Json(body)).into_response()
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::OrderNotFound(_) | StoreError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::IntegrityViolation { .. } | StoreError::AlreadyShipped(_) => {
            StatusCode::CONFLICT
        }
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::OutOfRange(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Database(_) | StoreError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fulfillment_status(err: &FulfillmentError) -> StatusCode {
    match err {
        FulfillmentError::NotFound(_) => StatusCode::NOT_FOUND,
        FulfillmentError::IntegrityViolation { .. } | FulfillmentError::AlreadyShipped(_) => {
            StatusCode::CONFLICT
        }
        FulfillmentError::ConnectionFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
        FulfillmentError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        FulfillmentError::Store(err) => store_status(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ItemId, OrderId};
    use inventory_store::{ConstraintKind, schema};
    use std::time::Duration;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::ItemNotFound(ItemId::new(1)), StatusCode::NOT_FOUND),
            (StoreError::AlreadyShipped(OrderId::new(1)), StatusCode::CONFLICT),
            (StoreError::Validation("empty".into()), StatusCode::BAD_REQUEST),
            (
                StoreError::OutOfRange("total".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                StoreError::violation(ConstraintKind::Unique, schema::USERS_USERNAME_KEY, "taken"),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn fulfillment_errors_map_to_statuses() {
        let order_id = OrderId::new(3);
        let timed_out = FulfillmentError::TimedOut {
            order_id,
            after: Duration::from_millis(10),
        };
        assert_eq!(ApiError::from(timed_out).status(), StatusCode::GATEWAY_TIMEOUT);

        let missing = FulfillmentError::NotFound(order_id);
        assert_eq!(ApiError::from(missing).status(), StatusCode::NOT_FOUND);

        let other = FulfillmentError::Store(StoreError::Validation("bad".into()));
        assert_eq!(ApiError::from(other).status(), StatusCode::BAD_REQUEST);
    }
}
