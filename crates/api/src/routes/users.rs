//! Customer account endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::UserId;
use inventory_store::{InventoryStore, NewUser};
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct UserCreatedResponse {
    pub user_id: UserId,
    pub username: String,
}

/// POST /users: register a customer. A taken username is a 409.
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<UserCreatedResponse>), ApiError> {
    let username = req.username.clone();
    let user_id = state.store.add_user(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse { user_id, username }),
    ))
}
