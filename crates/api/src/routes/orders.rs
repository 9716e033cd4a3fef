//! Order endpoints and the shipping trigger.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, OrderId, UserId};
use inventory_store::{InventoryStore, LineItem, NewOrder, Shipment, ShippedLine, StoreError};
use serde::Serialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: OrderId,
    pub shipped: bool,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipped: bool,
    pub lines: Vec<LineItem>,
    pub total: Money,
}

#[derive(Serialize)]
pub struct ShipmentResponse {
    pub order_id: OrderId,
    pub shipped: bool,
    pub units: i64,
    pub lines: Vec<ShippedLine>,
}

impl From<Shipment> for ShipmentResponse {
    fn from(shipment: Shipment) -> Self {
        Self {
            order_id: shipment.order_id,
            shipped: true,
            units: shipment.units(),
            lines: shipment.lines,
        }
    }
}

// -- Handlers --

/// POST /orders: create an order together with its line items.
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id, lines = req.lines.len()))]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let order_id = state.store.create_order(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_id,
            shipped: false,
        }),
    ))
}

/// GET /orders/{id}: an order with its line items.
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    let lines = state.store.line_items_for_order(order_id).await?;
    let total = Money::checked_sum(lines.iter().map(|line| line.extended_cost))
        .ok_or_else(|| StoreError::OutOfRange(format!("total of order {order_id}")))?;

    Ok(Json(OrderResponse {
        id: order.id,
        user_id: order.user_id,
        shipped: order.shipped,
        total,
        lines,
    }))
}

/// POST /orders/{id}/ship: ship the order atomically.
///
/// Either every line item is taken out of inventory and the order is marked
/// shipped, or nothing changes and the error explains why.
#[tracing::instrument(skip(state))]
pub async fn ship<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let shipment = state.fulfillment.fulfill(order_id).await?;
    Ok(Json(shipment.into()))
}
