//! Inventory models: warehouses, stock per warehouse and stock movements

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// A physical warehouse holding stock
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Purchase,
    Sale,
    Adjustment,
    TransferIn,
    TransferOut,
    SaleCancel,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Purchase => "purchase",
            MovementKind::Sale => "sale",
            MovementKind::Adjustment => "adjustment",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::SaleCancel => "sale_cancel",
        }
    }

    /// Whether movements of this kind add stock
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            MovementKind::Purchase | MovementKind::TransferIn | MovementKind::SaleCancel
        )
    }

    /// Whether a signed ledger quantity fits this kind: inbound kinds add units,
    /// outbound kinds remove them, adjustments go either way
    pub fn accepts(&self, quantity: i32) -> bool {
        match self {
            MovementKind::Adjustment => quantity != 0,
            kind if kind.is_inbound() => quantity > 0,
            _ => quantity < 0,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(MovementKind::Purchase),
            "sale" => Ok(MovementKind::Sale),
            "adjustment" => Ok(MovementKind::Adjustment),
            "transfer_in" => Ok(MovementKind::TransferIn),
            "transfer_out" => Ok(MovementKind::TransferOut),
            "sale_cancel" => Ok(MovementKind::SaleCancel),
            other => Err(DomainError::UnknownValue {
                kind: "movement kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Ensure `requested` units can be taken from `available`
pub fn ensure_available(requested: i32, available: i32) -> DomainResult<()> {
    if requested <= 0 {
        return Err(DomainError::InvalidQuantity(requested));
    }
    if requested > available {
        return Err(DomainError::InsufficientStock {
            requested,
            available,
        });
    }
    Ok(())
}

/// Apply a signed delta to a stock level. Stock never goes negative.
pub fn apply_stock_delta(current: i32, delta: i32) -> DomainResult<i32> {
    let out_of_range = || DomainError::validation("delta", "out of range");
    let next = current.checked_add(delta).ok_or_else(out_of_range)?;
    if next < 0 {
        return Err(DomainError::InsufficientStock {
            requested: delta.checked_neg().ok_or_else(out_of_range)?,
            available: current,
        });
    }
    Ok(next)
}

/// A validated transfer between two warehouses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockTransfer {
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub quantity: i32,
}

impl StockTransfer {
    pub fn new(
        product_id: Uuid,
        from_warehouse_id: Uuid,
        to_warehouse_id: Uuid,
        quantity: i32,
    ) -> DomainResult<Self> {
        if from_warehouse_id == to_warehouse_id {
            return Err(DomainError::validation(
                "to_warehouse_id",
                "must differ from the source warehouse",
            ));
        }
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        Ok(Self {
            product_id,
            from_warehouse_id,
            to_warehouse_id,
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_available() {
        assert!(ensure_available(5, 5).is_ok());
        assert_eq!(
            ensure_available(6, 5),
            Err(DomainError::InsufficientStock {
                requested: 6,
                available: 5
            })
        );
        assert_eq!(ensure_available(0, 5), Err(DomainError::InvalidQuantity(0)));
    }

    #[test]
    fn test_apply_stock_delta() {
        assert_eq!(apply_stock_delta(10, -10), Ok(0));
        assert_eq!(apply_stock_delta(10, 5), Ok(15));
        assert!(apply_stock_delta(3, -4).is_err());
        assert!(apply_stock_delta(i32::MAX, 1).is_err());
    }

    #[test]
    fn test_apply_stock_delta_min_delta() {
        assert_eq!(
            apply_stock_delta(0, i32::MIN),
            Err(DomainError::validation("delta", "out of range"))
        );
        assert_eq!(
            apply_stock_delta(5, i32::MIN + 1),
            Err(DomainError::InsufficientStock {
                requested: i32::MAX,
                available: 5
            })
        );
    }

    #[test]
    fn test_transfer_rules() {
        let product = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(StockTransfer::new(product, a, a, 1).is_err());
        assert!(StockTransfer::new(product, a, b, 0).is_err());

        let transfer = StockTransfer::new(product, a, b, 4).unwrap();
        assert_eq!(transfer.from_warehouse_id, a);
        assert_eq!(transfer.to_warehouse_id, b);
    }

    #[test]
    fn test_movement_kind_round_trip() {
        for kind in [
            MovementKind::Purchase,
            MovementKind::Sale,
            MovementKind::Adjustment,
            MovementKind::TransferIn,
            MovementKind::TransferOut,
            MovementKind::SaleCancel,
        ] {
            assert_eq!(kind.as_str().parse::<MovementKind>(), Ok(kind));
        }
        assert!("refund".parse::<MovementKind>().is_err());
        assert!(MovementKind::SaleCancel.is_inbound());
        assert!(!MovementKind::Sale.is_inbound());
    }

    #[test]
    fn test_movement_sign() {
        assert!(MovementKind::Purchase.accepts(24));
        assert!(!MovementKind::Purchase.accepts(-24));
        assert!(MovementKind::Sale.accepts(-2));
        assert!(!MovementKind::TransferOut.accepts(3));
        assert!(MovementKind::Adjustment.accepts(-5));
        assert!(MovementKind::Adjustment.accepts(5));
        assert!(!MovementKind::Adjustment.accepts(0));
    }
}
