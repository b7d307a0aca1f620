//! Client handlers: back office client management and the customer account

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Address, Client, ListQuery};
use crate::services::client::{AddressInput, ClientInput};
use crate::services::sales::{SaleView, SalesNote};
use crate::services::{ClientService, SalesService};
use crate::AppState;
use shared::PaginatedResponse;

// ----------------------------------------------------------------------------
// Back office
// ----------------------------------------------------------------------------

pub async fn list_clients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<Client>>, AppError> {
    user.require("client", "view")?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.list(&query).await?))
}

pub async fn get_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    user.require("client", "view")?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.get(client_id).await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ClientInput>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    user.require("client", "create")?;

    let service = ClientService::new(state.db.clone());
    let client = service.create(input).await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
    Json(input): Json<ClientInput>,
) -> Result<Json<Client>, AppError> {
    user.require("client", "edit")?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.update(client_id, input).await?))
}

pub async fn delete_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require("client", "delete")?;

    let service = ClientService::new(state.db.clone());
    service.delete(client_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delivery addresses of a client, for the back office
pub async fn list_client_addresses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<Address>>, AppError> {
    user.require("client", "view")?;

    let service = ClientService::new(state.db.clone());
    service.get(client_id).await?;
    Ok(Json(service.list_addresses(client_id).await?))
}

// ----------------------------------------------------------------------------
// Customer account
// ----------------------------------------------------------------------------

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Client>, AppError> {
    let client_id = user.require_client()?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.get(client_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ClientInput>,
) -> Result<Json<Client>, AppError> {
    let client_id = user.require_client()?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.update(client_id, input).await?))
}

pub async fn list_addresses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Address>>, AppError> {
    let client_id = user.require_client()?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.list_addresses(client_id).await?))
}

pub async fn get_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(address_id): Path<Uuid>,
) -> Result<Json<Address>, AppError> {
    let client_id = user.require_client()?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.get_address(client_id, address_id).await?))
}

pub async fn create_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>), AppError> {
    let client_id = user.require_client()?;

    let service = ClientService::new(state.db.clone());
    let address = service.create_address(client_id, input).await?;

    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(address_id): Path<Uuid>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>, AppError> {
    let client_id = user.require_client()?;

    let service = ClientService::new(state.db.clone());
    Ok(Json(service.update_address(client_id, address_id, input).await?))
}

pub async fn delete_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(address_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let client_id = user.require_client()?;

    let service = ClientService::new(state.db.clone());
    service.delete_address(client_id, address_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// The customer's orders, newest first
pub async fn list_my_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<SalesNote>>, AppError> {
    let client_id = user.require_client()?;

    let service = SalesService::new(state.db.clone());
    Ok(Json(service.client_orders(client_id, &query).await?))
}

pub async fn get_my_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<SaleView>, AppError> {
    let client_id = user.require_client()?;

    let service = SalesService::new(state.db.clone());
    Ok(Json(service.client_order(client_id, order_id).await?))
}
