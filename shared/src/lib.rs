//! Shared types and domain rules for the Drinks Shop platform
//!
//! This crate contains the types and pure business rules shared between the
//! backend, the storefront (via WASM), and the test suites.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
