//! Checkout wizard handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::checkout::{
    CheckoutView, PaymentDetailsInput, PaymentDetailsResponse, ProcessResponse,
    SelectAddressInput, SelectPaymentTypeInput,
};
use crate::services::CheckoutService;
use crate::AppState;

fn checkout_service(state: &AppState) -> CheckoutService {
    CheckoutService::new(
        state.db.clone(),
        state.qr_gateway.clone(),
        state.approver.clone(),
        state.config.store.currency.clone(),
    )
}

pub async fn start_checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CheckoutView>, AppError> {
    let client_id = user.require_client()?;
    Ok(Json(checkout_service(&state).start(client_id).await?))
}

pub async fn get_checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CheckoutView>, AppError> {
    let client_id = user.require_client()?;
    Ok(Json(checkout_service(&state).current(client_id).await?))
}

pub async fn select_checkout_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SelectAddressInput>,
) -> Result<Json<CheckoutView>, AppError> {
    let client_id = user.require_client()?;
    Ok(Json(checkout_service(&state).select_address(client_id, input).await?))
}

pub async fn select_checkout_payment_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SelectPaymentTypeInput>,
) -> Result<Json<CheckoutView>, AppError> {
    let client_id = user.require_client()?;
    Ok(Json(
        checkout_service(&state)
            .select_payment_type(client_id, input)
            .await?,
    ))
}

pub async fn submit_payment_details(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<PaymentDetailsInput>,
) -> Result<Json<PaymentDetailsResponse>, AppError> {
    let client_id = user.require_client()?;
    Ok(Json(
        checkout_service(&state)
            .payment_details(client_id, input)
            .await?,
    ))
}

pub async fn confirm_checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CheckoutView>, AppError> {
    let client_id = user.require_client()?;
    Ok(Json(checkout_service(&state).confirm(client_id).await?))
}

/// Commit the order. A declined card still creates the (cancelled) sale.
pub async fn process_checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(StatusCode, Json<ProcessResponse>), AppError> {
    let client_id = user.require_client()?;
    let result = checkout_service(&state).process(client_id).await?;

    Ok((StatusCode::CREATED, Json(result)))
}
