//! Inventory item endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ItemId, Money};
use inventory_store::{InventoryStore, InventorySummary, Item, ItemOrder, ItemQuery, NewItem};
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct ListItemsParams {
    pub name: Option<String>,
    pub contains: Option<String>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    /// Decimal amount such as `2.50`.
    pub cheaper_than: Option<String>,
    pub order: Option<ItemOrder>,
    pub limit: Option<usize>,
}

impl TryFrom<ListItemsParams> for ItemQuery {
    type Error = ApiError;

    fn try_from(params: ListItemsParams) -> Result<Self, ApiError> {
        let cheaper_than = params
            .cheaper_than
            .as_deref()
            .map(str::parse::<Money>)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(ItemQuery {
            name: params.name,
            name_contains: params.contains,
            min_quantity: params.min_quantity,
            max_quantity: params.max_quantity,
            cheaper_than,
            order: params.order.unwrap_or_default(),
            limit: params.limit,
            ..ItemQuery::default()
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemsRequest {
    pub items: Vec<NewItem>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    pub delta: i32,
}

// -- Response types --

#[derive(Serialize)]
pub struct ItemsCreatedResponse {
    pub item_ids: Vec<ItemId>,
}

#[derive(Serialize)]
pub struct ItemResponse {
    #[serde(flatten)]
    pub item: Item,
    /// `null` when the value does not fit in 64-bit cents.
    pub inventory_value: Option<Money>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            inventory_value: item.inventory_value(),
            item,
        }
    }
}

// -- Handlers --

/// GET /items: filtered, ordered item listing.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state.store.list_items(params.try_into()?).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// POST /items: insert a batch of items, all or nothing.
#[tracing::instrument(skip(state, req), fields(count = req.items.len()))]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateItemsRequest>,
) -> Result<(StatusCode, Json<ItemsCreatedResponse>), ApiError> {
    let item_ids = state.store.add_items(req.items).await?;
    Ok((StatusCode::CREATED, Json(ItemsCreatedResponse { item_ids })))
}

/// GET /items/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    let item = state
        .store
        .get_item(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {id} not found")))?;
    Ok(Json(item.into()))
}

/// POST /items/{id}/adjust: restock (positive delta) or write off stock.
#[tracing::instrument(skip(state))]
pub async fn adjust<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AdjustQuantityRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    let item = state.store.adjust_quantity(item_id, req.delta).await?;
    Ok(Json(item.into()))
}

/// DELETE /items/{id}: removes the item and every line item referencing it.
#[tracing::instrument(skip(state))]
pub async fn delete<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item_id: ItemId = parse_id(&id)?;
    if state.store.delete_item(item_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Item {id} not found")))
    }
}

/// GET /inventory/summary
#[tracing::instrument(skip(state))]
pub async fn summary<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<InventorySummary>, ApiError> {
    Ok(Json(state.store.inventory_summary().await?))
}
