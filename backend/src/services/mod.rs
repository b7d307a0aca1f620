//! Business logic services for the Drinks Shop platform

pub mod auth;
pub mod cart;
pub mod category;
pub mod checkout;
pub mod client;
pub mod payment;
pub mod product;
pub mod provider;
pub mod purchase;
pub mod reporting;
pub mod sales;
pub mod stock;
pub mod warehouse;

pub use auth::AuthService;
pub use cart::CartService;
pub use category::CategoryService;
pub use checkout::CheckoutService;
pub use client::ClientService;
pub use payment::{PaymentApprover, PaymentService, SimulatedApprover};
pub use product::ProductService;
pub use provider::ProviderService;
pub use purchase::PurchaseService;
pub use reporting::ReportingService;
pub use sales::SalesService;
pub use stock::StockService;
pub use warehouse::WarehouseService;
