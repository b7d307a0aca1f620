//! Shopping cart tests
//!
//! Property-based and unit tests for the cart aggregate:
//! - the stored total always equals the sum of line subtotals
//! - a line never holds more units than its stock pairing has
//! - one line per (product, warehouse) pairing
//! - a processed cart cannot change

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{line_subtotal, Cart, CartStatus, DomainError, LineChange};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Prices between 0.50 and 999.99
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (50i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone)]
enum CartOp {
    Add { pairing: usize, quantity: i32 },
    Set { pairing: usize, quantity: i32 },
    Remove { pairing: usize },
}

fn op_strategy() -> impl Strategy<Value = CartOp> {
    prop_oneof![
        (0usize..4, 1i32..6).prop_map(|(pairing, quantity)| CartOp::Add { pairing, quantity }),
        (0usize..4, 0i32..8).prop_map(|(pairing, quantity)| CartOp::Set { pairing, quantity }),
        (0usize..4).prop_map(|pairing| CartOp::Remove { pairing }),
    ]
}

struct Pairing {
    product_id: Uuid,
    warehouse_id: Uuid,
    price: Decimal,
    available: i32,
}

fn pairings(prices: &[Decimal], stock: &[i32]) -> Vec<Pairing> {
    let warehouse_id = Uuid::new_v4();
    prices
        .iter()
        .zip(stock)
        .map(|(price, available)| Pairing {
            product_id: Uuid::new_v4(),
            warehouse_id,
            price: *price,
            available: *available,
        })
        .collect()
}

fn line_of(cart: &Cart, pairing: &Pairing) -> Option<Uuid> {
    cart.items
        .iter()
        .find(|l| l.product_id == pairing.product_id && l.warehouse_id == pairing.warehouse_id)
        .map(|l| l.id)
}

fn apply(cart: &mut Cart, pairings: &[Pairing], op: &CartOp) {
    // Rejected operations must leave the cart untouched, checked by the invariants below
    let _ = match *op {
        CartOp::Add { pairing, quantity } => {
            let p = &pairings[pairing];
            cart.add_item(p.product_id, p.warehouse_id, "Producto", quantity, p.price, p.available)
        }
        CartOp::Set { pairing, quantity } => {
            let p = &pairings[pairing];
            match line_of(cart, p) {
                Some(line_id) => cart.set_quantity(line_id, quantity, p.available),
                None => return,
            }
        }
        CartOp::Remove { pairing } => match line_of(cart, &pairings[pairing]) {
            Some(line_id) => cart.remove_item(line_id),
            None => return,
        },
    };
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The total is the sum of the line subtotals after any sequence of changes
    #[test]
    fn prop_total_matches_lines(
        prices in proptest::collection::vec(price_strategy(), 4),
        stock in proptest::collection::vec(0i32..10, 4),
        ops in proptest::collection::vec(op_strategy(), 1..30),
    ) {
        let pairings = pairings(&prices, &stock);
        let mut cart = Cart::new(Uuid::new_v4());

        for op in &ops {
            apply(&mut cart, &pairings, op);

            let sum: Decimal = cart.items.iter().map(|l| l.subtotal).sum();
            prop_assert_eq!(cart.total, sum);
            for line in &cart.items {
                prop_assert_eq!(line.subtotal, line_subtotal(line.quantity, line.unit_price));
            }
        }
    }

    /// No line ever exceeds the stock of its pairing, and quantities stay positive
    #[test]
    fn prop_lines_within_stock(
        prices in proptest::collection::vec(price_strategy(), 4),
        stock in proptest::collection::vec(0i32..10, 4),
        ops in proptest::collection::vec(op_strategy(), 1..30),
    ) {
        let pairings = pairings(&prices, &stock);
        let mut cart = Cart::new(Uuid::new_v4());

        for op in &ops {
            apply(&mut cart, &pairings, op);

            for line in &cart.items {
                let pairing = pairings
                    .iter()
                    .find(|p| p.product_id == line.product_id)
                    .unwrap();
                prop_assert!(line.quantity > 0);
                prop_assert!(line.quantity <= pairing.available);
            }
        }
    }

    /// Adding the same pairing twice merges into one line
    #[test]
    fn prop_same_pairing_merges(
        price in price_strategy(),
        first in 1i32..5,
        second in 1i32..5,
    ) {
        let mut cart = Cart::new(Uuid::new_v4());
        let (product_id, warehouse_id) = (Uuid::new_v4(), Uuid::new_v4());

        cart.add_item(product_id, warehouse_id, "Singani", first, price, 10).unwrap();
        let change = cart.add_item(product_id, warehouse_id, "Singani", second, price, 10).unwrap();

        prop_assert!(matches!(change, LineChange::Updated(_)));
        prop_assert_eq!(cart.items.len(), 1);
        prop_assert_eq!(cart.items[0].quantity, first + second);
        prop_assert_eq!(cart.item_count(), first + second);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_beyond_stock_is_rejected() {
        let mut cart = Cart::new(Uuid::new_v4());
        let err = cart
            .add_item(Uuid::new_v4(), Uuid::new_v4(), "Vino tinto", 4, dec("85.00"), 3)
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 4,
                available: 3
            }
        );
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[test]
    fn test_merge_checks_combined_quantity() {
        let mut cart = Cart::new(Uuid::new_v4());
        let (product_id, warehouse_id) = (Uuid::new_v4(), Uuid::new_v4());

        cart.add_item(product_id, warehouse_id, "Cerveza", 2, dec("12.50"), 3).unwrap();
        let err = cart
            .add_item(product_id, warehouse_id, "Cerveza", 2, dec("12.50"), 3)
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientStock { requested: 4, .. }));
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total, dec("25.00"));
    }

    #[test]
    fn test_price_snapshot_kept_on_merge() {
        let mut cart = Cart::new(Uuid::new_v4());
        let (product_id, warehouse_id) = (Uuid::new_v4(), Uuid::new_v4());

        cart.add_item(product_id, warehouse_id, "Whisky", 1, dec("250.00"), 5).unwrap();
        // price changed in the catalog meanwhile
        cart.add_item(product_id, warehouse_id, "Whisky", 1, dec("300.00"), 5).unwrap();

        assert_eq!(cart.items[0].unit_price, dec("250.00"));
        assert_eq!(cart.total, dec("500.00"));
    }

    #[test]
    fn test_same_product_other_warehouse_is_new_line() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product_id = Uuid::new_v4();

        cart.add_item(product_id, Uuid::new_v4(), "Ron", 1, dec("90.00"), 5).unwrap();
        cart.add_item(product_id, Uuid::new_v4(), "Ron", 1, dec("90.00"), 5).unwrap();

        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(Uuid::new_v4(), Uuid::new_v4(), "Agua", 3, dec("5.00"), 10).unwrap();
        let line_id = cart.items[0].id;

        let change = cart.set_quantity(line_id, 0, 10).unwrap();

        assert_eq!(change, LineChange::Removed(line_id));
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_line() {
        let mut cart = Cart::new(Uuid::new_v4());
        let missing = Uuid::new_v4();
        assert_eq!(cart.remove_item(missing), Err(DomainError::LineNotFound(missing)));
    }

    #[test]
    fn test_processed_cart_is_frozen() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(Uuid::new_v4(), Uuid::new_v4(), "Vodka", 1, dec("70.00"), 2).unwrap();
        cart.mark_processed().unwrap();

        assert_eq!(cart.status, CartStatus::Processed);
        assert_eq!(cart.clear(), Err(DomainError::CartNotActive));
        assert!(cart
            .add_item(Uuid::new_v4(), Uuid::new_v4(), "Gin", 1, dec("80.00"), 2)
            .is_err());
        assert_eq!(cart.mark_processed(), Err(DomainError::CartNotActive));
    }

    #[test]
    fn test_empty_cart_cannot_be_processed() {
        let mut cart = Cart::new(Uuid::new_v4());
        assert_eq!(cart.mark_processed(), Err(DomainError::EmptyCart));
        assert_eq!(cart.status, CartStatus::Active);
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!("active".parse::<CartStatus>().unwrap(), CartStatus::Active);
        assert_eq!(CartStatus::Processed.as_str(), "processed");
        assert!("closed".parse::<CartStatus>().is_err());
    }
}
