//! Inventory handlers: warehouses, stock levels and stock movements

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{ListQuery, Warehouse};
use crate::services::stock::{
    AdjustStockInput, StockFilter, StockLevel, StockMovement, TransferResult, TransferStockInput,
};
use crate::services::warehouse::WarehouseInput;
use crate::services::{StockService, WarehouseService};
use crate::AppState;
use shared::PaginatedResponse;

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

// ----------------------------------------------------------------------------
// Warehouses
// ----------------------------------------------------------------------------

pub async fn list_warehouses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<Warehouse>>, AppError> {
    user.require("warehouse", "view")?;

    let service = WarehouseService::new(state.db.clone());
    Ok(Json(service.list(&query).await?))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> Result<Json<Warehouse>, AppError> {
    user.require("warehouse", "view")?;

    let service = WarehouseService::new(state.db.clone());
    Ok(Json(service.get(warehouse_id).await?))
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<WarehouseInput>,
) -> Result<(StatusCode, Json<Warehouse>), AppError> {
    user.require("warehouse", "create")?;

    let service = WarehouseService::new(state.db.clone());
    let warehouse = service.create(input).await?;

    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<WarehouseInput>,
) -> Result<Json<Warehouse>, AppError> {
    user.require("warehouse", "edit")?;

    let service = WarehouseService::new(state.db.clone());
    Ok(Json(service.update(warehouse_id, input).await?))
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require("warehouse", "delete")?;

    let service = WarehouseService::new(state.db.clone());
    service.delete(warehouse_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Stock
// ----------------------------------------------------------------------------

fn stock_service(state: &AppState) -> StockService {
    StockService::new(state.db.clone(), state.config.store.low_stock_threshold)
}

pub async fn list_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<StockFilter>,
) -> Result<Json<PaginatedResponse<StockLevel>>, AppError> {
    user.require("stock", "view")?;

    Ok(Json(stock_service(&state).list(&query, &filter).await?))
}

pub async fn list_low_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LowStockQuery>,
) -> Result<Json<Vec<StockLevel>>, AppError> {
    user.require("stock", "view")?;

    Ok(Json(stock_service(&state).low_stock(query.threshold).await?))
}

pub async fn list_movements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<StockFilter>,
) -> Result<Json<PaginatedResponse<StockMovement>>, AppError> {
    user.require("stock", "view")?;

    Ok(Json(stock_service(&state).movements(&query, &filter).await?))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AdjustStockInput>,
) -> Result<Json<StockLevel>, AppError> {
    user.require("stock", "edit")?;

    Ok(Json(stock_service(&state).adjust(user.user_id, input).await?))
}

pub async fn transfer_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TransferStockInput>,
) -> Result<Json<TransferResult>, AppError> {
    user.require("stock", "edit")?;

    Ok(Json(stock_service(&state).transfer(user.user_id, input).await?))
}
