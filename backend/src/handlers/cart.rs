//! Shopping cart handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::Cart;
use crate::services::cart::{AddItemInput, UpdateItemInput};
use crate::services::CartService;
use crate::AppState;

pub async fn get_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Cart>, AppError> {
    let client_id = user.require_client()?;

    let service = CartService::new(state.db.clone());
    Ok(Json(service.get(client_id).await?))
}

pub async fn add_cart_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddItemInput>,
) -> Result<Json<Cart>, AppError> {
    let client_id = user.require_client()?;

    let service = CartService::new(state.db.clone());
    Ok(Json(service.add_item(client_id, input).await?))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> Result<Json<Cart>, AppError> {
    let client_id = user.require_client()?;

    let service = CartService::new(state.db.clone());
    Ok(Json(service.update_item(client_id, item_id, input).await?))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Cart>, AppError> {
    let client_id = user.require_client()?;

    let service = CartService::new(state.db.clone());
    Ok(Json(service.remove_item(client_id, item_id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Cart>, AppError> {
    let client_id = user.require_client()?;

    let service = CartService::new(state.db.clone());
    Ok(Json(service.clear(client_id).await?))
}
