//! Configuration management for the Drinks Shop platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with DRINKS_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Payment gateway configuration
    pub payment: PaymentConfig,

    /// Store-wide settings
    pub store: StoreConfig,

    /// Administrator created at startup when missing
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// QR / mobile-money gateway endpoint
    pub qr_api_url: String,

    /// Merchant identifier assigned by the gateway
    pub commerce_id: String,

    /// Gateway API key, also used to sign callbacks
    pub api_key: String,

    /// Public URL the gateway calls when a QR payment settles
    pub callback_url: String,

    /// Gateway request timeout in seconds
    pub timeout_secs: u64,

    /// Percentage of simulated card charges that are approved
    pub approval_rate: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// ISO currency code used for prices
    pub currency: String,

    /// Stock level at or below which a pairing is reported as low
    pub low_stock_threshold: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Empty disables the bootstrap
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("DRINKS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("payment.qr_api_url", "https://sandbox.tigomoney.bo/api/qr")?
            .set_default("payment.commerce_id", "")?
            .set_default("payment.api_key", "")?
            .set_default(
                "payment.callback_url",
                "http://localhost:3000/api/v1/payments/qr/callback",
            )?
            .set_default("payment.timeout_secs", 10)?
            .set_default("payment.approval_rate", i64::from(shared::DEFAULT_APPROVAL_RATE))?
            .set_default("store.currency", "BOB")?
            .set_default("store.low_stock_threshold", 10)?
            .set_default("admin.email", "")?
            .set_default("admin.password", "")?
            .set_default("admin.name", "Administrador")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (DRINKS_ prefix)
            .add_source(
                Environment::with_prefix("DRINKS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
