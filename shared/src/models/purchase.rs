//! Providers and purchase notes (goods received)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// A supplier of drinks
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A received purchase from a provider
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseNote {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub warehouse_id: Uuid,
    pub purchase_date: NaiveDate,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A line of a purchase note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

impl PurchaseLine {
    pub fn total(&self) -> DomainResult<Decimal> {
        Decimal::from(self.quantity)
            .checked_mul(self.unit_cost)
            .ok_or_else(|| DomainError::validation("unit_cost", "out of range"))
    }
}

/// Validate purchase lines and return the note total
pub fn purchase_total(lines: &[PurchaseLine]) -> DomainResult<Decimal> {
    if lines.is_empty() {
        return Err(DomainError::validation(
            "details",
            "a purchase note needs at least one line",
        ));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::InvalidQuantity(line.quantity));
        }
        if line.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation("unit_cost", "cannot be negative"));
        }
    }
    lines.iter().try_fold(Decimal::ZERO, |total, line| {
        total
            .checked_add(line.total()?)
            .ok_or_else(|| DomainError::validation("unit_cost", "out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_total() {
        let lines = vec![
            PurchaseLine {
                product_id: Uuid::new_v4(),
                quantity: 24,
                unit_cost: Decimal::new(850, 2),
            },
            PurchaseLine {
                product_id: Uuid::new_v4(),
                quantity: 6,
                unit_cost: Decimal::from(60),
            },
        ];
        assert_eq!(purchase_total(&lines), Ok(Decimal::from(564)));
    }

    #[test]
    fn test_purchase_total_rejects_bad_lines() {
        assert!(purchase_total(&[]).is_err());
        let zero = PurchaseLine {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_cost: Decimal::ONE,
        };
        assert_eq!(purchase_total(&[zero]), Err(DomainError::InvalidQuantity(0)));
    }

    #[test]
    fn test_purchase_total_overflow() {
        let huge = PurchaseLine {
            product_id: Uuid::new_v4(),
            quantity: 2,
            unit_cost: Decimal::MAX,
        };
        let out_of_range = Err(DomainError::validation("unit_cost", "out of range"));
        assert_eq!(huge.total(), out_of_range);
        assert_eq!(purchase_total(&[huge]), out_of_range);

        let half = PurchaseLine {
            product_id: Uuid::new_v4(),
            quantity: 1,
            unit_cost: Decimal::MAX,
        };
        assert_eq!(purchase_total(&[half.clone(), half]), out_of_range);
    }
}
