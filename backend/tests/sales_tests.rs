//! Sales, orders and payment tests
//!
//! - Status machines only allow their documented moves
//! - Approval outcomes map to consistent payment/note/order statuses
//! - Sale lines carry the cart's price snapshot and totals

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    payment_reference, sale_lines_from_cart, sale_total, simulated_approval, ApprovalOutcome,
    CartLine, DomainError, OrderStatus, PaymentMethod, PaymentStatus, SalesNoteStatus,
    DEFAULT_APPROVAL_RATE,
};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Processing),
        Just(OrderStatus::Cancelled),
    ]
}

fn note_status_strategy() -> impl Strategy<Value = SalesNoteStatus> {
    prop_oneof![
        Just(SalesNoteStatus::Pending),
        Just(SalesNoteStatus::Completed),
        Just(SalesNoteStatus::Cancelled),
    ]
}

fn payment_status_strategy() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Paid),
        Just(PaymentStatus::Failed),
    ]
}

fn cart_line_strategy() -> impl Strategy<Value = CartLine> {
    (1i32..12, 100i64..50_000).prop_map(|(quantity, cents)| {
        CartLine::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Producto",
            quantity,
            Decimal::new(cents, 2),
        )
    })
}

proptest! {
    /// Cancelled orders are terminal and nothing returns to pending
    #[test]
    fn prop_order_transitions(from in order_status_strategy(), to in order_status_strategy()) {
        let result = from.transition(to);
        if from == OrderStatus::Cancelled || to == OrderStatus::Pending {
            let is_invalid = matches!(result, Err(DomainError::InvalidTransition { .. }));
            prop_assert!(is_invalid);
        }
        if result.is_ok() {
            prop_assert_ne!(from, to);
        }
    }

    /// Cancelled sales notes are terminal
    #[test]
    fn prop_note_transitions(from in note_status_strategy(), to in note_status_strategy()) {
        if from == SalesNoteStatus::Cancelled {
            prop_assert!(!from.can_transition_to(to));
        }
        if to == SalesNoteStatus::Cancelled && from != SalesNoteStatus::Cancelled {
            prop_assert!(from.can_transition_to(to));
        }
    }

    /// Payments only ever leave the pending state
    #[test]
    fn prop_payment_transitions(from in payment_status_strategy(), to in payment_status_strategy()) {
        let allowed = from.can_transition_to(to);
        prop_assert_eq!(allowed, from == PaymentStatus::Pending && to != PaymentStatus::Pending);
    }

    /// Cash always settles, QR always waits, cards follow the roll
    #[test]
    fn prop_simulated_approval(roll in 1u8..=100, rate in 0u8..=100) {
        prop_assert_eq!(simulated_approval(PaymentMethod::Cash, roll, rate), ApprovalOutcome::Approved);
        prop_assert_eq!(
            simulated_approval(PaymentMethod::Qr, roll, rate),
            ApprovalOutcome::AwaitingConfirmation
        );
        let card = simulated_approval(PaymentMethod::Card, roll, rate);
        if roll <= rate {
            prop_assert_eq!(card, ApprovalOutcome::Approved);
        } else {
            prop_assert_eq!(card, ApprovalOutcome::Declined);
        }
    }

    /// Sale lines mirror the cart lines and the totals agree
    #[test]
    fn prop_sale_lines_from_cart(lines in proptest::collection::vec(cart_line_strategy(), 1..8)) {
        let sale_lines = sale_lines_from_cart(&lines).unwrap();
        prop_assert_eq!(sale_lines.len(), lines.len());

        for (sale, cart) in sale_lines.iter().zip(&lines) {
            prop_assert_eq!(sale.product_id, cart.product_id);
            prop_assert_eq!(sale.warehouse_id, cart.warehouse_id);
            prop_assert_eq!(sale.quantity, cart.quantity);
            prop_assert_eq!(sale.unit_price, cart.unit_price);
            prop_assert_eq!(sale.total, Decimal::from(cart.quantity) * cart.unit_price);
        }

        let cart_total: Decimal = lines.iter().map(|l| l.subtotal).sum();
        prop_assert_eq!(sale_total(&sale_lines), cart_total);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_approved_outcome_statuses() {
        assert_eq!(
            ApprovalOutcome::Approved.resulting_statuses(),
            (
                PaymentStatus::Paid,
                SalesNoteStatus::Completed,
                OrderStatus::Processing
            )
        );
        assert!(ApprovalOutcome::Approved.keeps_stock_decrement());
    }

    #[test]
    fn test_declined_outcome_restores_stock() {
        assert_eq!(
            ApprovalOutcome::Declined.resulting_statuses(),
            (
                PaymentStatus::Failed,
                SalesNoteStatus::Cancelled,
                OrderStatus::Cancelled
            )
        );
        assert!(!ApprovalOutcome::Declined.keeps_stock_decrement());
    }

    #[test]
    fn test_qr_outcome_stays_pending_but_reserves_stock() {
        let (payment, note, order) = ApprovalOutcome::AwaitingConfirmation.resulting_statuses();
        assert_eq!(payment, PaymentStatus::Pending);
        assert_eq!(note, SalesNoteStatus::Pending);
        assert_eq!(order, OrderStatus::Pending);
        assert!(ApprovalOutcome::AwaitingConfirmation.keeps_stock_decrement());
    }

    #[test]
    fn test_outcome_statuses_are_reachable_from_pending() {
        for outcome in [ApprovalOutcome::Approved, ApprovalOutcome::Declined] {
            let (payment, note, order) = outcome.resulting_statuses();
            assert!(PaymentStatus::Pending.transition(payment).is_ok());
            assert!(SalesNoteStatus::Pending.transition(note).is_ok());
            assert!(OrderStatus::Pending.transition(order).is_ok());
        }
    }

    #[test]
    fn test_default_rate_edges() {
        assert_eq!(
            simulated_approval(PaymentMethod::Card, DEFAULT_APPROVAL_RATE, DEFAULT_APPROVAL_RATE),
            ApprovalOutcome::Approved
        );
        assert_eq!(
            simulated_approval(PaymentMethod::Card, DEFAULT_APPROVAL_RATE + 1, DEFAULT_APPROVAL_RATE),
            ApprovalOutcome::Declined
        );
        assert_eq!(
            simulated_approval(PaymentMethod::Card, 1, 0),
            ApprovalOutcome::Declined
        );
    }

    #[test]
    fn test_empty_cart_has_no_sale_lines() {
        assert_eq!(sale_lines_from_cart(&[]), Err(DomainError::EmptyCart));
    }

    #[test]
    fn test_payment_reference_format() {
        assert_eq!(payment_reference(7), "QR-00000007");
        assert_eq!(payment_reference(123_456_789), "QR-123456789");
    }

    #[test]
    fn test_qr_settles_by_callback() {
        assert!(PaymentMethod::Qr.settles_by_callback());
        assert!(!PaymentMethod::Card.settles_by_callback());
        for roll in [1, 50, 100] {
            assert_eq!(
                simulated_approval(PaymentMethod::Qr, roll, 0),
                ApprovalOutcome::AwaitingConfirmation
            );
        }
        assert_eq!("qr".parse::<PaymentMethod>(), Ok(PaymentMethod::Qr));
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_cancelled_note_cannot_complete() {
        let err = SalesNoteStatus::Cancelled
            .transition(SalesNoteStatus::Completed)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                entity: "sales note",
                from: "cancelled".to_string(),
                to: "completed".to_string(),
            }
        );
    }

    #[test]
    fn test_cancellation_fails_only_pending_payments() {
        assert_eq!(
            PaymentStatus::Pending.after_cancellation(),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(PaymentStatus::Paid.after_cancellation(), None);
        assert_eq!(PaymentStatus::Failed.after_cancellation(), None);
    }
}
