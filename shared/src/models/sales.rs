//! Orders, sales notes and payments

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::cart::CartLine;

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Cancelled => "cancelled",
});

impl OrderStatus {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Processing)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
        )
    }

    pub fn transition(self, next: OrderStatus) -> DomainResult<OrderStatus> {
        guard("order", self, next, self.can_transition_to(next))
    }
}

/// Sales note status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SalesNoteStatus {
    Pending,
    Completed,
    Cancelled,
}

string_enum!(SalesNoteStatus, "sales note status", {
    Pending => "pending",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl SalesNoteStatus {
    pub fn can_transition_to(&self, next: SalesNoteStatus) -> bool {
        matches!(
            (self, next),
            (SalesNoteStatus::Pending, SalesNoteStatus::Completed)
                | (SalesNoteStatus::Pending, SalesNoteStatus::Cancelled)
                | (SalesNoteStatus::Completed, SalesNoteStatus::Cancelled)
        )
    }

    pub fn transition(self, next: SalesNoteStatus) -> DomainResult<SalesNoteStatus> {
        guard("sales note", self, next, self.can_transition_to(next))
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
});

impl PaymentStatus {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }

    pub fn transition(self, next: PaymentStatus) -> DomainResult<PaymentStatus> {
        guard("payment", self, next, self.can_transition_to(next))
    }

    /// Payment status once its sale is cancelled, if it changes. A paid payment
    /// stays paid; refunds happen outside the system.
    pub fn after_cancellation(self) -> Option<PaymentStatus> {
        match self {
            PaymentStatus::Pending => Some(PaymentStatus::Failed),
            PaymentStatus::Paid | PaymentStatus::Failed => None,
        }
    }
}

fn guard<S: fmt::Display>(entity: &'static str, from: S, to: S, allowed: bool) -> DomainResult<S> {
    if allowed {
        Ok(to)
    } else {
        Err(DomainError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Payment method offered at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Qr,
}

string_enum!(PaymentMethod, "payment method", {
    Cash => "cash",
    Card => "card",
    Qr => "qr",
});

impl PaymentMethod {
    /// QR payments are confirmed asynchronously by the gateway callback
    pub fn settles_by_callback(&self) -> bool {
        matches!(self, PaymentMethod::Qr)
    }
}

/// Result of asking the payment processor to settle a charge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved,
    Declined,
    AwaitingConfirmation,
}

impl ApprovalOutcome {
    /// Status for the payment, sales note and order after the outcome
    pub fn resulting_statuses(&self) -> (PaymentStatus, SalesNoteStatus, OrderStatus) {
        match self {
            ApprovalOutcome::Approved => (
                PaymentStatus::Paid,
                SalesNoteStatus::Completed,
                OrderStatus::Processing,
            ),
            ApprovalOutcome::Declined => (
                PaymentStatus::Failed,
                SalesNoteStatus::Cancelled,
                OrderStatus::Cancelled,
            ),
            ApprovalOutcome::AwaitingConfirmation => (
                PaymentStatus::Pending,
                SalesNoteStatus::Pending,
                OrderStatus::Pending,
            ),
        }
    }

    /// Whether the sold units leave the warehouse
    pub fn keeps_stock_decrement(&self) -> bool {
        !matches!(self, ApprovalOutcome::Declined)
    }
}

/// Default share of simulated charges that are approved, in percent
pub const DEFAULT_APPROVAL_RATE: u8 = 95;

/// Decide a simulated charge from a roll in `1..=100`
pub fn simulated_approval(method: PaymentMethod, roll: u8, approval_rate: u8) -> ApprovalOutcome {
    if method.settles_by_callback() {
        return ApprovalOutcome::AwaitingConfirmation;
    }
    match method {
        PaymentMethod::Card if roll > approval_rate => ApprovalOutcome::Declined,
        _ => ApprovalOutcome::Approved,
    }
}

/// A line of a committed sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleLine {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl From<&CartLine> for SaleLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            warehouse_id: line.warehouse_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total: line.subtotal,
        }
    }
}

/// Turn cart lines into sale lines, failing on an empty cart
pub fn sale_lines_from_cart(lines: &[CartLine]) -> DomainResult<Vec<SaleLine>> {
    if lines.is_empty() {
        return Err(DomainError::EmptyCart);
    }
    Ok(lines.iter().map(SaleLine::from).collect())
}

pub fn sale_total(lines: &[SaleLine]) -> Decimal {
    lines.iter().map(|l| l.total).sum()
}

/// Reference sent to the payment gateway for a QR charge
pub fn payment_reference(sequence: i64) -> String {
    format!("QR-{:08}", sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_transitions() {
        assert!(OrderStatus::Pending.transition(OrderStatus::Processing).is_ok());
        assert!(OrderStatus::Processing.transition(OrderStatus::Cancelled).is_ok());
        assert!(OrderStatus::Cancelled.transition(OrderStatus::Pending).is_err());
        assert!(OrderStatus::Processing.transition(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_sales_note_transitions() {
        assert!(SalesNoteStatus::Pending.can_transition_to(SalesNoteStatus::Completed));
        assert!(SalesNoteStatus::Completed.can_transition_to(SalesNoteStatus::Cancelled));
        assert!(!SalesNoteStatus::Cancelled.can_transition_to(SalesNoteStatus::Completed));
        assert!(!SalesNoteStatus::Completed.can_transition_to(SalesNoteStatus::Pending));
    }

    #[test]
    fn test_payment_transitions() {
        assert!(PaymentStatus::Pending.transition(PaymentStatus::Paid).is_ok());
        let err = PaymentStatus::Paid.transition(PaymentStatus::Failed).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                entity: "payment",
                from: "paid".to_string(),
                to: "failed".to_string(),
            }
        );
    }

    #[test]
    fn test_simulated_approval() {
        assert_eq!(
            simulated_approval(PaymentMethod::Card, 95, DEFAULT_APPROVAL_RATE),
            ApprovalOutcome::Approved
        );
        assert_eq!(
            simulated_approval(PaymentMethod::Card, 96, DEFAULT_APPROVAL_RATE),
            ApprovalOutcome::Declined
        );
        assert_eq!(
            simulated_approval(PaymentMethod::Cash, 100, 0),
            ApprovalOutcome::Approved
        );
        assert_eq!(
            simulated_approval(PaymentMethod::Qr, 1, 100),
            ApprovalOutcome::AwaitingConfirmation
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("processing".parse::<OrderStatus>(), Ok(OrderStatus::Processing));
        assert_eq!("qr".parse::<PaymentMethod>(), Ok(PaymentMethod::Qr));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_sale_lines_from_cart() {
        assert_eq!(sale_lines_from_cart(&[]), Err(DomainError::EmptyCart));

        let line = CartLine::new(Uuid::new_v4(), Uuid::new_v4(), "Ron", 2, Decimal::from(70));
        let lines = sale_lines_from_cart(&[line]).unwrap();
        assert_eq!(sale_total(&lines), Decimal::from(140));
    }

    #[test]
    fn test_payment_reference_format() {
        assert_eq!(payment_reference(42), "QR-00000042");
    }
}
