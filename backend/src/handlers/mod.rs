//! HTTP handlers for the Drinks Shop API

mod auth;
mod cart;
mod catalog;
mod checkout;
mod client;
mod health;
mod inventory;
mod payment;
mod purchasing;
mod reporting;
mod sales;

pub use auth::*;
pub use cart::*;
pub use catalog::*;
pub use checkout::*;
pub use client::*;
pub use health::*;
pub use inventory::*;
pub use payment::*;
pub use purchasing::*;
pub use reporting::*;
pub use sales::*;
