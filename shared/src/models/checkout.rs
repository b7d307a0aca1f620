//! Checkout wizard steps and session state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::sales::{ApprovalOutcome, PaymentMethod};

/// Ordered steps of the checkout wizard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Summary,
    Address,
    PaymentType,
    PaymentDetails,
    Confirm,
    Processed,
}

impl CheckoutStep {
    pub const ALL: [CheckoutStep; 6] = [
        CheckoutStep::Summary,
        CheckoutStep::Address,
        CheckoutStep::PaymentType,
        CheckoutStep::PaymentDetails,
        CheckoutStep::Confirm,
        CheckoutStep::Processed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Summary => "summary",
            CheckoutStep::Address => "address",
            CheckoutStep::PaymentType => "payment_type",
            CheckoutStep::PaymentDetails => "payment_details",
            CheckoutStep::Confirm => "confirm",
            CheckoutStep::Processed => "processed",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<CheckoutStep> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// A session may stay on its step, go back to any earlier step, or advance
    /// exactly one step. Nothing leaves `Processed`.
    pub fn can_move_to(&self, target: CheckoutStep) -> bool {
        if *self == CheckoutStep::Processed {
            return false;
        }
        target <= *self || Some(target) == self.next()
    }

    pub fn move_to(self, target: CheckoutStep) -> DomainResult<CheckoutStep> {
        if self.can_move_to(target) {
            Ok(target)
        } else {
            Err(DomainError::CheckoutStep {
                current: self.to_string(),
                requested: target.to_string(),
            })
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckoutStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|step| step.as_str() == s)
            .copied()
            .ok_or_else(|| DomainError::UnknownValue {
                kind: "checkout step",
                value: s.to_string(),
            })
    }
}

/// Selections gathered by the wizard for one cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub cart_id: Uuid,
    pub step: CheckoutStep,
    pub address_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    /// Last four digits of the card, when paying by card
    pub card_last4: Option<String>,
    /// Gateway reference of the QR issued for this checkout
    pub qr_reference: Option<String>,
}

impl CheckoutSession {
    /// Begin (or restart) checkout for a cart
    pub fn start(cart_id: Uuid) -> Self {
        Self {
            cart_id,
            step: CheckoutStep::Summary,
            address_id: None,
            payment_method: None,
            card_last4: None,
            qr_reference: None,
        }
    }

    /// Drop selections made at or after `step`
    fn discard_from(&mut self, step: CheckoutStep) {
        if step <= CheckoutStep::Address {
            self.address_id = None;
        }
        if step <= CheckoutStep::PaymentType {
            self.payment_method = None;
        }
        if step <= CheckoutStep::PaymentDetails {
            self.card_last4 = None;
            self.qr_reference = None;
        }
    }

    fn enter(&mut self, step: CheckoutStep) -> DomainResult<()> {
        self.step = self.step.move_to(step)?;
        self.discard_from(step);
        Ok(())
    }

    pub fn select_address(&mut self, address_id: Uuid) -> DomainResult<()> {
        self.enter(CheckoutStep::Address)?;
        self.address_id = Some(address_id);
        Ok(())
    }

    pub fn select_payment_method(&mut self, method: PaymentMethod) -> DomainResult<()> {
        self.enter(CheckoutStep::PaymentType)?;
        self.payment_method = Some(method);
        Ok(())
    }

    /// Record the payment details step. Card payments carry the last four digits,
    /// QR payments the gateway reference.
    pub fn record_payment_details(
        &mut self,
        card_last4: Option<String>,
        qr_reference: Option<String>,
    ) -> DomainResult<()> {
        let method = self
            .payment_method
            .ok_or_else(|| self.blocked(CheckoutStep::PaymentDetails))?;
        match method {
            PaymentMethod::Card if card_last4.is_none() => {
                return Err(DomainError::validation("card", "card details are required"));
            }
            PaymentMethod::Qr if qr_reference.is_none() => {
                return Err(DomainError::validation("qr", "a QR reference is required"));
            }
            _ => {}
        }
        self.enter(CheckoutStep::PaymentDetails)?;
        self.card_last4 = card_last4;
        self.qr_reference = qr_reference;
        Ok(())
    }

    pub fn confirm(&mut self) -> DomainResult<()> {
        if self.step < CheckoutStep::PaymentDetails {
            return Err(self.blocked(CheckoutStep::Confirm));
        }
        self.step = self.step.move_to(CheckoutStep::Confirm)?;
        Ok(())
    }

    /// Check that the session is ready to commit an order
    pub fn ready_to_process(&self) -> DomainResult<(Uuid, PaymentMethod)> {
        match (self.step, self.address_id, self.payment_method) {
            (CheckoutStep::Confirm, Some(address_id), Some(method)) => Ok((address_id, method)),
            _ => Err(self.blocked(CheckoutStep::Processed)),
        }
    }

    /// Apply the result of the order commit to the session
    pub fn complete(&mut self, outcome: ApprovalOutcome) -> DomainResult<()> {
        self.ready_to_process()?;
        match outcome {
            ApprovalOutcome::Declined => {
                // the customer picks a payment type again
                self.step = CheckoutStep::Address;
                self.discard_from(CheckoutStep::PaymentType);
            }
            ApprovalOutcome::Approved | ApprovalOutcome::AwaitingConfirmation => {
                self.step = CheckoutStep::Processed;
            }
        }
        Ok(())
    }

    /// The cart's lines changed: checkout starts over from the summary.
    /// A processed session is left alone.
    pub fn cart_changed(&mut self) {
        if self.step != CheckoutStep::Processed {
            *self = Self::start(self.cart_id);
        }
    }

    fn blocked(&self, requested: CheckoutStep) -> DomainError {
        DomainError::CheckoutStep {
            current: self.step.to_string(),
            requested: requested.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at_confirm(method: PaymentMethod) -> CheckoutSession {
        let mut session = CheckoutSession::start(Uuid::new_v4());
        session.select_address(Uuid::new_v4()).unwrap();
        session.select_payment_method(method).unwrap();
        let card = (method == PaymentMethod::Card).then(|| "4242".to_string());
        let qr = (method == PaymentMethod::Qr).then(|| "QR-00000001".to_string());
        session.record_payment_details(card, qr).unwrap();
        session.confirm().unwrap();
        session
    }

    #[test]
    fn test_step_moves() {
        use CheckoutStep::*;
        assert!(Summary.can_move_to(Address));
        assert!(!Summary.can_move_to(PaymentType));
        assert!(Confirm.can_move_to(Address));
        assert!(Confirm.can_move_to(Processed));
        assert!(!Processed.can_move_to(Summary));
        assert!(Address.can_move_to(Address));
    }

    #[test]
    fn test_cannot_skip_address() {
        let mut session = CheckoutSession::start(Uuid::new_v4());
        let err = session.select_payment_method(PaymentMethod::Cash).unwrap_err();
        assert!(matches!(err, DomainError::CheckoutStep { .. }));
        assert_eq!(session.step, CheckoutStep::Summary);
    }

    #[test]
    fn test_going_back_discards_later_selections() {
        let mut session = session_at_confirm(PaymentMethod::Card);
        assert_eq!(session.card_last4.as_deref(), Some("4242"));

        let new_address = Uuid::new_v4();
        session.select_address(new_address).unwrap();
        assert_eq!(session.step, CheckoutStep::Address);
        assert_eq!(session.address_id, Some(new_address));
        assert_eq!(session.payment_method, None);
        assert_eq!(session.card_last4, None);
    }

    #[test]
    fn test_card_details_required() {
        let mut session = CheckoutSession::start(Uuid::new_v4());
        session.select_address(Uuid::new_v4()).unwrap();
        session.select_payment_method(PaymentMethod::Card).unwrap();
        assert!(session.record_payment_details(None, None).is_err());
        assert_eq!(session.step, CheckoutStep::PaymentType);
    }

    #[test]
    fn test_confirm_requires_payment_details() {
        let mut session = CheckoutSession::start(Uuid::new_v4());
        session.select_address(Uuid::new_v4()).unwrap();
        assert!(session.confirm().is_err());
    }

    #[test]
    fn test_complete_outcomes() {
        let mut approved = session_at_confirm(PaymentMethod::Cash);
        let (_, method) = approved.ready_to_process().unwrap();
        assert_eq!(method, PaymentMethod::Cash);
        approved.complete(ApprovalOutcome::Approved).unwrap();
        assert_eq!(approved.step, CheckoutStep::Processed);
        assert!(approved.ready_to_process().is_err());

        let mut declined = session_at_confirm(PaymentMethod::Card);
        let address = declined.address_id;
        declined.complete(ApprovalOutcome::Declined).unwrap();
        assert_eq!(declined.step, CheckoutStep::Address);
        assert_eq!(declined.address_id, address);
        assert_eq!(declined.payment_method, None);
    }

    #[test]
    fn test_step_parsing() {
        for step in CheckoutStep::ALL {
            assert_eq!(step.as_str().parse::<CheckoutStep>(), Ok(step));
        }
        assert!("shipping".parse::<CheckoutStep>().is_err());
    }
}
