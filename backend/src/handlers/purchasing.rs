//! Purchasing handlers: providers and purchase notes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{ListQuery, Provider};
use crate::services::provider::ProviderInput;
use crate::services::purchase::{
    CreatePurchaseInput, PurchaseFilter, PurchaseNoteSummary, PurchaseNoteWithDetails,
};
use crate::services::{ProviderService, PurchaseService};
use crate::AppState;
use shared::PaginatedResponse;

pub async fn list_providers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<Provider>>, AppError> {
    user.require("provider", "view")?;

    let service = ProviderService::new(state.db.clone());
    Ok(Json(service.list(&query).await?))
}

pub async fn get_provider(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Provider>, AppError> {
    user.require("provider", "view")?;

    let service = ProviderService::new(state.db.clone());
    Ok(Json(service.get(provider_id).await?))
}

pub async fn create_provider(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ProviderInput>,
) -> Result<(StatusCode, Json<Provider>), AppError> {
    user.require("provider", "create")?;

    let service = ProviderService::new(state.db.clone());
    let provider = service.create(input).await?;

    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn update_provider(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(provider_id): Path<Uuid>,
    Json(input): Json<ProviderInput>,
) -> Result<Json<Provider>, AppError> {
    user.require("provider", "edit")?;

    let service = ProviderService::new(state.db.clone());
    Ok(Json(service.update(provider_id, input).await?))
}

pub async fn delete_provider(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(provider_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require("provider", "delete")?;

    let service = ProviderService::new(state.db.clone());
    service.delete(provider_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_purchases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<PurchaseFilter>,
) -> Result<Json<PaginatedResponse<PurchaseNoteSummary>>, AppError> {
    user.require("purchase", "view")?;

    let service = PurchaseService::new(state.db.clone());
    Ok(Json(service.list(&query, &filter).await?))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<PurchaseNoteWithDetails>, AppError> {
    user.require("purchase", "view")?;

    let service = PurchaseService::new(state.db.clone());
    Ok(Json(service.get(purchase_id).await?))
}

/// Register a purchase; stock enters the note's warehouse
pub async fn create_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePurchaseInput>,
) -> Result<(StatusCode, Json<PurchaseNoteWithDetails>), AppError> {
    user.require("purchase", "create")?;

    let service = PurchaseService::new(state.db.clone());
    let note = service.create(user.user_id, input).await?;

    Ok((StatusCode::CREATED, Json(note)))
}
