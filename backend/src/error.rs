//! Error handling for the Drinks Shop platform
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Checkout step error: {0}")]
    CheckoutStep(String),

    // External service errors
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            DomainError::InvalidQuantity(q) => AppError::Validation {
                field: "quantity".to_string(),
                message: format!("Quantity must be positive, got {}", q),
                message_es: format!("La cantidad debe ser positiva, se recibió {}", q),
            },
            DomainError::EmptyCart => AppError::EmptyCart,
            DomainError::CartNotActive => {
                AppError::InvalidStateTransition("cart is no longer active".to_string())
            }
            DomainError::LineNotFound(_) => AppError::NotFound("Cart item".to_string()),
            DomainError::InvalidTransition { .. } => AppError::InvalidStateTransition(err.to_string()),
            DomainError::CheckoutStep { .. } => AppError::CheckoutStep(err.to_string()),
            DomainError::Validation { field, message } => AppError::Validation {
                field: field.to_string(),
                message: message.to_string(),
                message_es: format!("Dato inválido: {}", field),
            },
            DomainError::UnknownValue { .. } => AppError::ValidationError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: errors.to_string(),
            message_es: format!("Dato inválido: {}", field),
            field,
        }
    }
}

impl AppError {
    /// Validation error for a single field
    pub fn invalid(field: &str, message: &str, message_es: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }

    /// Conflict raised when a delete is blocked by dependent records
    pub fn in_use(resource: &str, message: &str, message_es: &str) -> Self {
        AppError::Conflict {
            resource: resource.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message_en: "Invalid email or password".to_string(),
                    message_es: "Correo o contraseña incorrectos".to_string(),
                    field: None,
                },
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_es: "La sesión ha expirado".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_es: "Token inválido".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_es: "No tiene permiso para realizar esta acción".to_string(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("Datos inválidos: {}", msg),
                    field: None,
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message_en: format!("A record with this {} already exists", field),
                    message_es: format!("Ya existe un registro con este {}", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict {
                resource,
                message,
                message_es,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("No se encontró {}", resource),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("No se puede cambiar el estado: {}", msg),
                    field: None,
                },
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("Stock insuficiente: {}", msg),
                    field: None,
                },
            ),
            AppError::EmptyCart => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "EMPTY_CART".to_string(),
                    message_en: "The cart is empty".to_string(),
                    message_es: "El carrito está vacío".to_string(),
                    field: None,
                },
            ),
            AppError::CheckoutStep(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CHECKOUT_STEP".to_string(),
                    message_en: msg.clone(),
                    message_es: "Complete los pasos anteriores del pago".to_string(),
                    field: None,
                },
            ),
            AppError::PaymentGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "PAYMENT_GATEWAY_ERROR".to_string(),
                    message_en: format!("Payment gateway error: {}", msg),
                    message_es: format!("Error en la pasarela de pago: {}", msg),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_es: "Ocurrió un error en la base de datos".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Map a unique-violation from Postgres into a duplicate-entry error
pub fn map_unique_violation(err: sqlx::Error, field: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateEntry(field.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
