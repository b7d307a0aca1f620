//! Payment handlers: payment types and the QR gateway endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Html,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::external::qr_gateway::{mock_page, SIGNATURE_HEADER};
use crate::middleware::CurrentUser;
use crate::services::payment::{Payment, PaymentType, QrCallbackInput};
use crate::services::PaymentService;
use crate::AppState;

/// Payment types offered at checkout (public)
pub async fn list_payment_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentType>>, AppError> {
    let service = PaymentService::new(state.db.clone());
    Ok(Json(service.list_types().await?))
}

/// Payment of a sales note
pub async fn get_sale_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sales_note_id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    user.require("sale", "view")?;

    let service = PaymentService::new(state.db.clone());
    Ok(Json(service.get_for_sale(sales_note_id).await?))
}

/// Local stand-in for the gateway's QR page (public)
pub async fn qr_mock_page(Path(reference): Path<String>) -> Html<String> {
    Html(mock_page(&reference))
}

/// Settlement notification from the QR gateway (public, signed)
pub async fn qr_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Payment>, AppError> {
    if state.qr_gateway.signs_callbacks() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::InvalidToken)?;

        if !state.qr_gateway.verify_callback(&body, signature) {
            tracing::warn!("QR callback with invalid signature rejected");
            return Err(AppError::InvalidToken);
        }
    } else {
        tracing::warn!("Accepting unsigned QR callback, no gateway API key configured");
    }

    let input: QrCallbackInput = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("Invalid callback body: {}", e)))?;

    let service = PaymentService::new(state.db.clone());
    Ok(Json(service.settle_qr(input).await?))
}
