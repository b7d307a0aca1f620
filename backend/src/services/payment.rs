//! Payment service: payment types, charge approval and QR settlement

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    simulated_approval, ApprovalOutcome, OrderStatus, PaymentMethod, PaymentStatus, SalesNoteStatus,
};
use crate::services::sales::restock_sale;

/// Decides whether a charge is approved
pub trait PaymentApprover: Send + Sync {
    fn decide(&self, method: PaymentMethod) -> ApprovalOutcome;
}

/// Approver standing in for a card processor: approves a configured share of charges
#[derive(Debug, Clone)]
pub struct SimulatedApprover {
    approval_rate: u8,
}

impl SimulatedApprover {
    pub fn new(approval_rate: u8) -> Self {
        Self {
            approval_rate: approval_rate.min(100),
        }
    }

    /// Uniform roll in 1..=100
    fn roll() -> u8 {
        (Uuid::new_v4().as_u128() % 100) as u8 + 1
    }
}

impl PaymentApprover for SimulatedApprover {
    fn decide(&self, method: PaymentMethod) -> ApprovalOutcome {
        let roll = Self::roll();
        let outcome = simulated_approval(method, roll, self.approval_rate);
        tracing::debug!(%method, roll, ?outcome, "Simulated payment decision");
        outcome
    }
}

#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
}

/// A payment option offered at checkout
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentType {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

/// Payment of a sales note
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub sales_note_id: Uuid,
    pub payment_type: String,
    pub amount: Decimal,
    pub status: String,
    pub reference: Option<String>,
    pub card_last4: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Notification sent by the QR gateway when a charge settles
#[derive(Debug, Deserialize)]
pub struct QrCallbackInput {
    pub reference: String,
    pub status: PaymentStatus,
}

#[derive(Debug, FromRow)]
struct PendingPayment {
    id: Uuid,
    status: String,
    sales_note_id: Uuid,
    sales_note_status: String,
    order_id: Uuid,
    order_status: String,
}

/// Payment of a sales note, read on the given connection
pub async fn payment_for_sale(conn: &mut PgConnection, sales_note_id: Uuid) -> AppResult<Payment> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT p.id, p.sales_note_id, pt.code AS payment_type, p.amount, p.status,
               p.reference, p.card_last4, p.paid_at, p.created_at
        FROM payments p
        JOIN payment_types pt ON pt.id = p.payment_type_id
        WHERE p.sales_note_id = $1
        ORDER BY p.created_at DESC
        LIMIT 1
        "#,
    )
    .bind(sales_note_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Payment".to_string()))
}

impl PaymentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Payment types currently offered
    pub async fn list_types(&self) -> AppResult<Vec<PaymentType>> {
        let types = sqlx::query_as::<_, PaymentType>(
            "SELECT id, code, name, is_active FROM payment_types WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(types)
    }

    pub async fn get_for_sale(&self, sales_note_id: Uuid) -> AppResult<Payment> {
        let mut conn = self.db.acquire().await?;
        payment_for_sale(&mut conn, sales_note_id).await
    }

    /// Settle a pending QR payment reported by the gateway.
    ///
    /// A repeated notification with the status already recorded is accepted as is.
    pub async fn settle_qr(&self, input: QrCallbackInput) -> AppResult<Payment> {
        let outcome = match input.status {
            PaymentStatus::Paid => ApprovalOutcome::Approved,
            PaymentStatus::Failed => ApprovalOutcome::Declined,
            PaymentStatus::Pending => {
                return Err(AppError::invalid(
                    "status",
                    "Callback status must be paid or failed",
                    "El estado debe ser pagado o fallido",
                ))
            }
        };

        let mut tx = self.db.begin().await?;

        let pending = sqlx::query_as::<_, PendingPayment>(
            r#"
            SELECT p.id, p.status, p.sales_note_id, sn.status AS sales_note_status,
                   o.id AS order_id, o.status AS order_status
            FROM payments p
            JOIN sales_notes sn ON sn.id = p.sales_note_id
            JOIN orders o ON o.id = sn.order_id
            WHERE p.reference = $1
            FOR UPDATE OF p, sn, o
            "#,
        )
        .bind(&input.reference)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

        let current = pending.status.parse::<PaymentStatus>()?;
        if current == input.status {
            tracing::info!(reference = %input.reference, "Duplicate QR callback ignored");
            return payment_for_sale(&mut tx, pending.sales_note_id).await;
        }

        let (payment_status, note_status, order_status) = outcome.resulting_statuses();
        current.transition(payment_status)?;
        pending
            .sales_note_status
            .parse::<SalesNoteStatus>()?
            .transition(note_status)?;
        pending
            .order_status
            .parse::<OrderStatus>()?
            .transition(order_status)?;

        sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, paid_at = CASE WHEN $1 = 'paid' THEN NOW() END, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(payment_status.as_str())
        .bind(pending.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE sales_notes SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(note_status.as_str())
            .bind(pending.sales_note_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(order_status.as_str())
            .bind(pending.order_id)
            .execute(&mut *tx)
            .await?;

        if !outcome.keeps_stock_decrement() {
            restock_sale(&mut tx, pending.sales_note_id, None).await?;
        }

        let payment = payment_for_sale(&mut tx, pending.sales_note_id).await?;
        tx.commit().await?;

        match outcome {
            ApprovalOutcome::Approved => {
                tracing::info!(reference = %input.reference, sales_note_id = %pending.sales_note_id, "QR payment confirmed")
            }
            _ => {
                tracing::warn!(reference = %input.reference, sales_note_id = %pending.sales_note_id, "QR payment failed, sale cancelled")
            }
        }

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_range() {
        for _ in 0..1000 {
            let roll = SimulatedApprover::roll();
            assert!((1..=100).contains(&roll));
        }
    }

    #[test]
    fn test_full_rate_always_approves_cards() {
        let approver = SimulatedApprover::new(100);
        for _ in 0..200 {
            assert_eq!(approver.decide(PaymentMethod::Card), ApprovalOutcome::Approved);
        }
    }

    #[test]
    fn test_zero_rate_always_declines_cards() {
        let approver = SimulatedApprover::new(0);
        for _ in 0..200 {
            assert_eq!(approver.decide(PaymentMethod::Card), ApprovalOutcome::Declined);
        }
    }

    #[test]
    fn test_cash_and_qr_ignore_the_roll() {
        let approver = SimulatedApprover::new(0);
        assert_eq!(approver.decide(PaymentMethod::Cash), ApprovalOutcome::Approved);
        assert_eq!(
            approver.decide(PaymentMethod::Qr),
            ApprovalOutcome::AwaitingConfirmation
        );
    }

    #[test]
    fn test_rate_is_capped() {
        assert_eq!(SimulatedApprover::new(250).approval_rate, 100);
    }
}
