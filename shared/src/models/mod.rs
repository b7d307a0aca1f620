//! Domain models for the Drinks Shop platform

mod cart;
mod catalog;
mod checkout;
mod client;
mod inventory;
mod purchase;
mod sales;
mod user;

pub use cart::*;
pub use catalog::*;
pub use checkout::*;
pub use client::*;
pub use inventory::*;
pub use purchase::*;
pub use sales::*;
pub use user::*;
