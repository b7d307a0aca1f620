//! Inventory and purchasing tests
//!
//! Property-based tests for the stock rules:
//! - stock levels never go negative
//! - ledger entries carry the sign of their movement kind
//! - purchase note totals equal the sum of their lines

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_stock_delta, ensure_available, pick_warehouse, purchase_total,
    total_available, DomainError, MovementKind, PurchaseLine, StockTransfer,
    WarehouseAvailability,
};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn availability_strategy() -> impl Strategy<Value = Vec<WarehouseAvailability>> {
    proptest::collection::vec(0i32..500, 1..6).prop_map(|levels| {
        levels
            .into_iter()
            .enumerate()
            .map(|(i, quantity)| WarehouseAvailability {
                warehouse_id: Uuid::new_v4(),
                warehouse_name: format!("Almacen {}", i + 1),
                quantity,
            })
            .collect()
    })
}

fn purchase_line_strategy() -> impl Strategy<Value = PurchaseLine> {
    (1i32..200, 1i64..50_000).prop_map(|(quantity, cents)| PurchaseLine {
        product_id: Uuid::new_v4(),
        quantity,
        unit_cost: Decimal::new(cents, 2),
    })
}

proptest! {
    /// Applying a delta either fails or leaves a non-negative level equal to current + delta
    #[test]
    fn prop_stock_never_negative(current in 0i32..10_000, delta in -20_000i32..20_000) {
        match apply_stock_delta(current, delta) {
            Ok(next) => {
                prop_assert!(next >= 0);
                prop_assert_eq!(next, current + delta);
            }
            Err(err) => {
                prop_assert!(current + delta < 0);
                let is_insufficient = matches!(err, DomainError::InsufficientStock { .. });
                prop_assert!(is_insufficient);
            }
        }
    }

    /// Transfer ledger rows cancel out and each matches its kind
    #[test]
    fn prop_transfer_ledger_balances(quantity in 1i32..1_000) {
        let transfer = StockTransfer::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), quantity)
            .unwrap();
        let rows = [
            (MovementKind::TransferOut, -transfer.quantity),
            (MovementKind::TransferIn, transfer.quantity),
        ];

        prop_assert!(rows.iter().all(|(kind, q)| kind.accepts(*q)));
        prop_assert_eq!(rows.iter().map(|(_, q)| q).sum::<i32>(), 0);
    }

    /// Only adjustments accept either sign; no kind accepts zero
    #[test]
    fn prop_movement_sign(quantity in -1_000i32..1_000) {
        for kind in [MovementKind::Purchase, MovementKind::TransferIn, MovementKind::SaleCancel] {
            prop_assert_eq!(kind.accepts(quantity), quantity > 0);
        }
        for kind in [MovementKind::Sale, MovementKind::TransferOut] {
            prop_assert_eq!(kind.accepts(quantity), quantity < 0);
        }
        prop_assert_eq!(MovementKind::Adjustment.accepts(quantity), quantity != 0);
    }

    /// Availability checks accept exactly the quantities in 1..=available
    #[test]
    fn prop_ensure_available(requested in -5i32..50, available in 0i32..40) {
        let ok = ensure_available(requested, available).is_ok();
        prop_assert_eq!(ok, requested > 0 && requested <= available);
    }

    /// The picked warehouse can serve the whole quantity and has the most stock
    #[test]
    fn prop_pick_warehouse(stock in availability_strategy(), quantity in 1i32..600) {
        let most = stock.iter().map(|s| s.quantity).max().unwrap_or(0);

        match pick_warehouse(&stock, quantity) {
            Some(id) => {
                let chosen = stock.iter().find(|s| s.warehouse_id == id).unwrap();
                prop_assert!(chosen.quantity >= quantity);
                prop_assert_eq!(chosen.quantity, most);
            }
            None => prop_assert!(most < quantity),
        }
        prop_assert!(total_available(&stock) >= most);
    }

    /// Purchase totals are the sum of quantity * unit cost
    #[test]
    fn prop_purchase_total(lines in proptest::collection::vec(purchase_line_strategy(), 1..10)) {
        let expected: Decimal = lines
            .iter()
            .map(|l| Decimal::from(l.quantity) * l.unit_cost)
            .sum();
        prop_assert_eq!(purchase_total(&lines).unwrap(), expected);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_transfer_to_same_warehouse_rejected() {
        let warehouse = Uuid::new_v4();
        let err = StockTransfer::new(Uuid::new_v4(), warehouse, warehouse, 5).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "to_warehouse_id",
                ..
            }
        ));
    }

    #[test]
    fn test_transfer_quantity_must_be_positive() {
        let err = StockTransfer::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), -2)
            .unwrap_err();
        assert_eq!(err, DomainError::InvalidQuantity(-2));
    }

    #[test]
    fn test_adjustment_reports_shortfall() {
        assert_eq!(
            apply_stock_delta(4, -7),
            Err(DomainError::InsufficientStock {
                requested: 7,
                available: 4
            })
        );
    }

    #[test]
    fn test_adjustment_by_minimum_delta_is_out_of_range() {
        assert_eq!(
            apply_stock_delta(0, i32::MIN),
            Err(DomainError::validation("delta", "out of range"))
        );
    }

    #[test]
    fn test_purchase_cost_overflow_rejected() {
        let lines = vec![PurchaseLine {
            product_id: Uuid::new_v4(),
            quantity: 2,
            unit_cost: Decimal::MAX,
        }];
        assert!(matches!(
            purchase_total(&lines),
            Err(DomainError::Validation { field: "unit_cost", .. })
        ));
    }

    #[test]
    fn test_total_available_ignores_negative_rows() {
        let rows = vec![
            WarehouseAvailability {
                warehouse_id: Uuid::new_v4(),
                warehouse_name: "Central".to_string(),
                quantity: 12,
            },
            WarehouseAvailability {
                warehouse_id: Uuid::new_v4(),
                warehouse_name: "El Alto".to_string(),
                quantity: -3,
            },
        ];
        assert_eq!(total_available(&rows), 12);
    }

    #[test]
    fn test_empty_purchase_rejected() {
        assert!(matches!(
            purchase_total(&[]),
            Err(DomainError::Validation { field: "details", .. })
        ));
    }

    #[test]
    fn test_purchase_line_with_negative_cost_rejected() {
        let lines = vec![PurchaseLine {
            product_id: Uuid::new_v4(),
            quantity: 6,
            unit_cost: Decimal::new(-100, 2),
        }];
        assert!(purchase_total(&lines).is_err());
    }

    #[test]
    fn test_movement_direction() {
        assert!(MovementKind::Purchase.is_inbound());
        assert!(MovementKind::SaleCancel.is_inbound());
        assert!(!MovementKind::Sale.is_inbound());
        assert!(!MovementKind::TransferOut.is_inbound());
        assert_eq!("transfer_in".parse::<MovementKind>(), Ok(MovementKind::TransferIn));
    }
}
