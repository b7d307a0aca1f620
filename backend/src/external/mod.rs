//! External API integrations

pub mod qr_gateway;

pub use qr_gateway::{QrGatewayClient, QrPayment, QrSource};
