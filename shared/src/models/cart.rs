//! Shopping cart aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::inventory::ensure_available;

/// Cart lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Active,
    Processed,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CartStatus::Active),
            "processed" => Ok(CartStatus::Processed),
            other => Err(DomainError::UnknownValue {
                kind: "cart status",
                value: other.to_string(),
            }),
        }
    }
}

/// A line in the cart, pointing at a (product, warehouse) stock pairing
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Sale price captured when the line was first added
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl CartLine {
    pub fn new(
        product_id: Uuid,
        warehouse_id: Uuid,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            warehouse_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            subtotal: line_subtotal(quantity, unit_price),
        }
    }

    fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
        self.subtotal = line_subtotal(quantity, self.unit_price);
    }
}

/// Subtotal of a single line
pub fn line_subtotal(quantity: i32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

/// What a cart mutation did to the stored lines
#[derive(Debug, Clone, PartialEq)]
pub enum LineChange {
    Inserted(CartLine),
    Updated(CartLine),
    Removed(Uuid),
}

/// A customer's cart with its derived total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub client_id: Uuid,
    pub status: CartStatus,
    pub items: Vec<CartLine>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// A fresh, empty active cart
    pub fn new(client_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            status: CartStatus::Active,
            items: Vec::new(),
            total: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units in the cart
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    pub fn line(&self, line_id: Uuid) -> Option<&CartLine> {
        self.items.iter().find(|l| l.id == line_id)
    }

    /// Recompute and store the total from the lines
    pub fn recompute_total(&mut self) -> Decimal {
        self.total = self.items.iter().map(|l| l.subtotal).sum();
        self.updated_at = Utc::now();
        self.total
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if self.status != CartStatus::Active {
            return Err(DomainError::CartNotActive);
        }
        Ok(())
    }

    /// Add units of a stock pairing. An existing line for the same pairing is merged,
    /// keeping its original price snapshot.
    ///
    /// `available` is the current stock of the pairing.
    pub fn add_item(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        product_name: &str,
        quantity: i32,
        unit_price: Decimal,
        available: i32,
    ) -> DomainResult<LineChange> {
        self.ensure_active()?;
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }

        let change = match self
            .items
            .iter_mut()
            .find(|l| l.product_id == product_id && l.warehouse_id == warehouse_id)
        {
            Some(line) => {
                let merged = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or(DomainError::InvalidQuantity(quantity))?;
                ensure_available(merged, available)?;
                line.set_quantity(merged);
                LineChange::Updated(line.clone())
            }
            None => {
                ensure_available(quantity, available)?;
                let line = CartLine::new(product_id, warehouse_id, product_name, quantity, unit_price);
                self.items.push(line.clone());
                LineChange::Inserted(line)
            }
        };

        self.recompute_total();
        Ok(change)
    }

    /// Set the quantity of a line. Zero removes the line.
    pub fn set_quantity(
        &mut self,
        line_id: Uuid,
        quantity: i32,
        available: i32,
    ) -> DomainResult<LineChange> {
        self.ensure_active()?;
        if quantity < 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        if quantity == 0 {
            return self.remove_item(line_id);
        }

        let line = self
            .items
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(DomainError::LineNotFound(line_id))?;
        ensure_available(quantity, available)?;
        line.set_quantity(quantity);
        let change = LineChange::Updated(line.clone());

        self.recompute_total();
        Ok(change)
    }

    pub fn remove_item(&mut self, line_id: Uuid) -> DomainResult<LineChange> {
        self.ensure_active()?;
        let index = self
            .items
            .iter()
            .position(|l| l.id == line_id)
            .ok_or(DomainError::LineNotFound(line_id))?;
        self.items.remove(index);
        self.recompute_total();
        Ok(LineChange::Removed(line_id))
    }

    pub fn clear(&mut self) -> DomainResult<()> {
        self.ensure_active()?;
        self.items.clear();
        self.recompute_total();
        Ok(())
    }

    /// Close the cart once its order has been committed
    pub fn mark_processed(&mut self) -> DomainResult<()> {
        self.ensure_active()?;
        if self.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        self.status = CartStatus::Processed;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64, scale: u32) -> Decimal {
        Decimal::new(n, scale)
    }

    #[test]
    fn test_add_merges_same_pairing() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let first = cart
            .add_item(product, warehouse, "Pilsener 620ml", 2, dec(1250, 2), 10)
            .unwrap();
        assert!(matches!(first, LineChange::Inserted(_)));

        let second = cart
            .add_item(product, warehouse, "Pilsener 620ml", 3, dec(9900, 2), 10)
            .unwrap();
        match second {
            LineChange::Updated(line) => {
                assert_eq!(line.quantity, 5);
                // price snapshot from the first add is kept
                assert_eq!(line.unit_price, dec(1250, 2));
            }
            other => panic!("unexpected change: {:?}", other),
        }

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total, dec(6250, 2));
    }

    #[test]
    fn test_same_product_other_warehouse_is_new_line() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Uuid::new_v4();
        cart.add_item(product, Uuid::new_v4(), "Singani", 1, Decimal::from(80), 5)
            .unwrap();
        cart.add_item(product, Uuid::new_v4(), "Singani", 1, Decimal::from(80), 5)
            .unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_add_checks_merged_quantity_against_stock() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();
        cart.add_item(product, warehouse, "Cola 2L", 4, Decimal::from(15), 5)
            .unwrap();

        let err = cart
            .add_item(product, warehouse, "Cola 2L", 2, Decimal::from(15), 5)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 6,
                available: 5
            }
        );
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new(Uuid::new_v4());
        let change = cart
            .add_item(Uuid::new_v4(), Uuid::new_v4(), "Agua 500ml", 3, Decimal::from(5), 10)
            .unwrap();
        let line_id = match change {
            LineChange::Inserted(line) => line.id,
            other => panic!("unexpected change: {:?}", other),
        };

        assert_eq!(
            cart.set_quantity(line_id, 0, 10).unwrap(),
            LineChange::Removed(line_id)
        );
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_line() {
        let mut cart = Cart::new(Uuid::new_v4());
        let missing = Uuid::new_v4();
        assert_eq!(
            cart.remove_item(missing),
            Err(DomainError::LineNotFound(missing))
        );
    }

    #[test]
    fn test_processed_cart_is_frozen() {
        let mut cart = Cart::new(Uuid::new_v4());
        assert_eq!(cart.mark_processed(), Err(DomainError::EmptyCart));

        cart.add_item(Uuid::new_v4(), Uuid::new_v4(), "Vino tinto", 1, Decimal::from(95), 1)
            .unwrap();
        cart.mark_processed().unwrap();
        assert_eq!(cart.status, CartStatus::Processed);
        assert_eq!(cart.clear(), Err(DomainError::CartNotActive));
    }
}
