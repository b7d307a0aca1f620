//! Back office sales handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::ListQuery;
use crate::services::sales::{SaleView, SalesFilter, SalesNote};
use crate::services::SalesService;
use crate::AppState;
use shared::PaginatedResponse;

pub async fn list_sales(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<SalesFilter>,
) -> Result<Json<PaginatedResponse<SalesNote>>, AppError> {
    user.require("sale", "view")?;

    let service = SalesService::new(state.db.clone());
    Ok(Json(service.list(&query, &filter).await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sales_note_id): Path<Uuid>,
) -> Result<Json<SaleView>, AppError> {
    user.require("sale", "view")?;

    let service = SalesService::new(state.db.clone());
    Ok(Json(service.get(sales_note_id).await?))
}

/// Cancel a sale and put its units back in stock
pub async fn cancel_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sales_note_id): Path<Uuid>,
) -> Result<Json<SaleView>, AppError> {
    user.require("sale", "edit")?;

    let service = SalesService::new(state.db.clone());
    Ok(Json(service.cancel(user.user_id, sales_note_id).await?))
}
