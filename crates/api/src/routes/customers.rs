//! Per-customer order reports.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use inventory_store::{CustomerOrderRow, CustomerOrdersQuery, InventoryStore, UserOrderCount};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerOrdersParams {
    pub shipped: Option<bool>,
    #[serde(default)]
    pub details: bool,
}

/// GET /customers/{username}/orders: a customer's orders, optionally only
/// shipped or unshipped ones, optionally one row per line item.
///
/// An unknown username yields an empty list rather than a 404.
#[tracing::instrument(skip(state))]
pub async fn orders<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(username): Path<String>,
    Query(params): Query<CustomerOrdersParams>,
) -> Result<Json<Vec<CustomerOrderRow>>, ApiError> {
    let query = CustomerOrdersQuery {
        username,
        shipped: params.shipped,
        details: params.details,
    };
    Ok(Json(state.store.orders_by_customer(query).await?))
}

/// GET /customers/order-counts: every customer with their number of orders.
#[tracing::instrument(skip(state))]
pub async fn order_counts<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<UserOrderCount>>, ApiError> {
    Ok(Json(state.store.order_counts().await?))
}
