//! Catalog models: categories and products

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// A product category (beer, wine, spirits, soft drinks...)
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A drink sold by the shop
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub volume_ml: i32,
    pub alcohol_percent: Decimal,
    pub sale_price: Decimal,
    pub purchase_price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock of a product held in one warehouse
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarehouseAvailability {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity: i32,
}

/// Total availability of a product across warehouses
pub fn total_available(stock: &[WarehouseAvailability]) -> i32 {
    stock
        .iter()
        .fold(0i32, |total, s| total.saturating_add(s.quantity.max(0)))
}

/// Pick the warehouse able to serve the full quantity, preferring the one with the most stock
pub fn pick_warehouse(stock: &[WarehouseAvailability], quantity: i32) -> Option<Uuid> {
    stock
        .iter()
        .filter(|s| s.quantity >= quantity)
        .max_by_key(|s| s.quantity)
        .map(|s| s.warehouse_id)
}

/// Validate the numeric fields of a product
pub fn validate_product_fields(
    volume_ml: i32,
    alcohol_percent: Decimal,
    sale_price: Decimal,
    purchase_price: Decimal,
) -> DomainResult<()> {
    if volume_ml <= 0 {
        return Err(DomainError::validation("volume_ml", "must be positive"));
    }
    if alcohol_percent < Decimal::ZERO || alcohol_percent > Decimal::from(100) {
        return Err(DomainError::validation(
            "alcohol_percent",
            "must be between 0 and 100",
        ));
    }
    if sale_price < Decimal::ZERO {
        return Err(DomainError::validation("sale_price", "cannot be negative"));
    }
    if purchase_price < Decimal::ZERO {
        return Err(DomainError::validation("purchase_price", "cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(quantity: i32) -> WarehouseAvailability {
        WarehouseAvailability {
            warehouse_id: Uuid::new_v4(),
            warehouse_name: "Central".to_string(),
            quantity,
        }
    }

    #[test]
    fn test_pick_warehouse_prefers_largest() {
        let small = stock(3);
        let large = stock(20);
        let rows = vec![small.clone(), large.clone()];

        assert_eq!(pick_warehouse(&rows, 2), Some(large.warehouse_id));
        assert_eq!(pick_warehouse(&rows, 21), None);
        assert_eq!(total_available(&rows), 23);
    }

    #[test]
    fn test_product_field_validation() {
        let ok = validate_product_fields(350, Decimal::new(45, 1), Decimal::from(12), Decimal::from(8));
        assert!(ok.is_ok());

        assert!(validate_product_fields(0, Decimal::ZERO, Decimal::ONE, Decimal::ONE).is_err());
        assert!(validate_product_fields(750, Decimal::from(101), Decimal::ONE, Decimal::ONE).is_err());
        assert!(validate_product_fields(750, Decimal::ZERO, Decimal::NEGATIVE_ONE, Decimal::ONE).is_err());
    }
}
