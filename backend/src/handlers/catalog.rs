//! Catalog handlers: categories, products and the storefront listing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Category, ListQuery, Product, WarehouseAvailability};
use crate::services::category::CategoryInput;
use crate::services::product::{ProductFilter, ProductInput, StoreProduct};
use crate::services::{CategoryService, ProductService};
use crate::AppState;
use shared::PaginatedResponse;

#[derive(Debug, Default, Deserialize)]
pub struct StoreFilter {
    pub category_id: Option<Uuid>,
}

// ----------------------------------------------------------------------------
// Categories
// ----------------------------------------------------------------------------

pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<Category>>, AppError> {
    user.require("category", "view")?;

    let service = CategoryService::new(state.db.clone());
    Ok(Json(service.list(&query).await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    user.require("category", "view")?;

    let service = CategoryService::new(state.db.clone());
    Ok(Json(service.get(category_id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    user.require("category", "create")?;

    let service = CategoryService::new(state.db.clone());
    let category = service.create(input).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, AppError> {
    user.require("category", "edit")?;

    let service = CategoryService::new(state.db.clone());
    Ok(Json(service.update(category_id, input).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require("category", "delete")?;

    let service = CategoryService::new(state.db.clone());
    service.delete(category_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Products
// ----------------------------------------------------------------------------

pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<PaginatedResponse<Product>>, AppError> {
    user.require("product", "view")?;

    let service = ProductService::new(state.db.clone());
    Ok(Json(service.list(&query, &filter).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    user.require("product", "view")?;

    let service = ProductService::new(state.db.clone());
    Ok(Json(service.get(product_id).await?))
}

/// Stock of a product in each warehouse
pub async fn get_product_availability(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<WarehouseAvailability>>, AppError> {
    user.require("product", "view")?;

    let service = ProductService::new(state.db.clone());
    Ok(Json(service.availability(product_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    user.require("product", "create")?;

    let service = ProductService::new(state.db.clone());
    let product = service.create(input).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    user.require("product", "edit")?;

    let service = ProductService::new(state.db.clone());
    Ok(Json(service.update(product_id, input).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require("product", "delete")?;

    let service = ProductService::new(state.db.clone());
    service.delete(product_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Storefront (public)
// ----------------------------------------------------------------------------

pub async fn browse_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<StoreFilter>,
) -> Result<Json<PaginatedResponse<StoreProduct>>, AppError> {
    let service = ProductService::new(state.db.clone());
    Ok(Json(service.browse(&query, filter.category_id).await?))
}

pub async fn get_store_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<StoreProduct>, AppError> {
    let service = ProductService::new(state.db.clone());
    Ok(Json(service.store_product(product_id).await?))
}

/// Categories shown in the storefront menu
pub async fn store_categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<Category>>, AppError> {
    let service = CategoryService::new(state.db.clone());
    Ok(Json(service.list(&query).await?))
}
