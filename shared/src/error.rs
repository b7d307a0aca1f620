//! Errors raised by the pure domain rules

use thiserror::Error;
use uuid::Uuid;

/// Violation of a domain rule
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart is not active")]
    CartNotActive,

    #[error("Cart line {0} not found")]
    LineNotFound(Uuid),

    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Checkout step {requested} is not reachable from {current}")]
    CheckoutStep { current: String, requested: String },

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("Unknown {kind} value: {value}")]
    UnknownValue { kind: &'static str, value: String },
}

impl DomainError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        DomainError::Validation { field, message }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
