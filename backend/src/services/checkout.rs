//! Checkout wizard service
//!
//! The wizard state for each active cart lives in `checkout_sessions`; the step
//! rules are the shared `CheckoutSession` machine. `process` commits the order.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{QrGatewayClient, QrPayment};
use crate::models::{
    format_address, payment_reference, sale_lines_from_cart, sale_total, Address, ApprovalOutcome,
    Cart, CheckoutSession, CheckoutStep, MovementKind, PaymentMethod,
};
use crate::services::cart::lock_active_cart;
use crate::services::payment::PaymentApprover;
use crate::services::sales::{load_sale, SaleView};
use crate::services::stock::{current_quantity, put_stock, record_movement, take_stock, NewMovement};
use shared::{ensure_available, validate_card, CardDetails};

#[derive(Clone)]
pub struct CheckoutService {
    db: PgPool,
    qr_gateway: QrGatewayClient,
    approver: Arc<dyn PaymentApprover>,
    currency: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectAddressInput {
    pub address_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SelectPaymentTypeInput {
    pub payment_type: String,
}

/// Payment details step; card data is only checked, never stored
#[derive(Debug, Default, Deserialize)]
pub struct PaymentDetailsInput {
    pub card: Option<CardDetails>,
}

/// Current wizard state with the cart it belongs to
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub session: CheckoutSession,
    pub cart: Cart,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_checkout_url: Option<String>,
}

/// Result of the payment details step
#[derive(Debug, Serialize)]
pub struct PaymentDetailsResponse {
    #[serde(flatten)]
    pub checkout: CheckoutView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<QrPayment>,
}

/// Result of committing an order
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub outcome: ApprovalOutcome,
    #[serde(flatten)]
    pub sale: SaleView,
    pub next_step: CheckoutStep,
}

#[derive(Debug, FromRow)]
struct SessionRow {
    cart_id: Uuid,
    step: String,
    address_id: Option<Uuid>,
    payment_method: Option<String>,
    card_last4: Option<String>,
    qr_reference: Option<String>,
    qr_checkout_url: Option<String>,
}

impl SessionRow {
    fn into_session(self) -> AppResult<(CheckoutSession, Option<String>)> {
        let session = CheckoutSession {
            cart_id: self.cart_id,
            step: self.step.parse()?,
            address_id: self.address_id,
            payment_method: self
                .payment_method
                .as_deref()
                .map(str::parse::<PaymentMethod>)
                .transpose()?,
            card_last4: self.card_last4,
            qr_reference: self.qr_reference,
        };
        Ok((session, self.qr_checkout_url))
    }
}

async fn load_session(
    conn: &mut PgConnection,
    cart_id: Uuid,
) -> AppResult<(CheckoutSession, Option<String>)> {
    sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT cart_id, step, address_id, payment_method, card_last4, qr_reference, qr_checkout_url
        FROM checkout_sessions
        WHERE cart_id = $1
        "#,
    )
    .bind(cart_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Checkout session".to_string()))?
    .into_session()
}

async fn save_session(
    conn: &mut PgConnection,
    session: &CheckoutSession,
    qr_checkout_url: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO checkout_sessions (
            cart_id, step, address_id, payment_method, card_last4, qr_reference, qr_checkout_url
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (cart_id) DO UPDATE
        SET step = EXCLUDED.step,
            address_id = EXCLUDED.address_id,
            payment_method = EXCLUDED.payment_method,
            card_last4 = EXCLUDED.card_last4,
            qr_reference = EXCLUDED.qr_reference,
            qr_checkout_url = EXCLUDED.qr_checkout_url,
            updated_at = NOW()
        "#,
    )
    .bind(session.cart_id)
    .bind(session.step.as_str())
    .bind(session.address_id)
    .bind(session.payment_method.map(|m| m.as_str()))
    .bind(&session.card_last4)
    .bind(&session.qr_reference)
    .bind(qr_checkout_url.filter(|_| session.qr_reference.is_some()))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Send open checkouts of the given carts back to the summary
pub async fn reset_checkouts(conn: &mut PgConnection, cart_ids: &[Uuid]) -> AppResult<()> {
    let rows = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT cart_id, step, address_id, payment_method, card_last4, qr_reference, qr_checkout_url
        FROM checkout_sessions
        WHERE cart_id = ANY($1)
        FOR UPDATE
        "#,
    )
    .bind(cart_ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in rows {
        let (mut session, _) = row.into_session()?;
        if session.step == CheckoutStep::Summary {
            continue;
        }
        session.cart_changed();
        save_session(conn, &session, None).await?;
        tracing::debug!(cart_id = %session.cart_id, "Cart changed, checkout restarted");
    }

    Ok(())
}

async fn client_address(
    conn: &mut PgConnection,
    client_id: Uuid,
    address_id: Uuid,
) -> AppResult<Address> {
    sqlx::query_as::<_, Address>(
        r#"
        SELECT id, client_id, label, street, city, reference, is_default, created_at
        FROM addresses
        WHERE id = $1 AND client_id = $2
        "#,
    )
    .bind(address_id)
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Address".to_string()))
}

/// Check every line of the cart against current stock
async fn ensure_cart_in_stock(conn: &mut PgConnection, cart: &Cart) -> AppResult<()> {
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }
    for line in &cart.items {
        let available = current_quantity(conn, line.product_id, line.warehouse_id).await?;
        ensure_available(line.quantity, available).map_err(|e| {
            AppError::InsufficientStock(format!("{}: {}", line.product_name, e))
        })?;
    }
    Ok(())
}

impl CheckoutService {
    pub fn new(
        db: PgPool,
        qr_gateway: QrGatewayClient,
        approver: Arc<dyn PaymentApprover>,
        currency: String,
    ) -> Self {
        Self {
            db,
            qr_gateway,
            approver,
            currency,
        }
    }

    /// Begin (or restart) checkout of the active cart
    pub async fn start(&self, client_id: Uuid) -> AppResult<CheckoutView> {
        let mut tx = self.db.begin().await?;
        let cart = lock_active_cart(&mut tx, client_id).await?;

        ensure_cart_in_stock(&mut tx, &cart).await?;

        let session = CheckoutSession::start(cart.id);
        save_session(&mut tx, &session, None).await?;
        tx.commit().await?;

        tracing::debug!(cart_id = %cart.id, "Checkout started");
        Ok(CheckoutView {
            session,
            cart,
            address: None,
            qr_checkout_url: None,
        })
    }

    /// Current wizard state
    pub async fn current(&self, client_id: Uuid) -> AppResult<CheckoutView> {
        let mut tx = self.db.begin().await?;
        let cart = lock_active_cart(&mut tx, client_id).await?;
        let (session, qr_checkout_url) = load_session(&mut tx, cart.id).await?;
        let view = self.view(&mut tx, client_id, session, cart, qr_checkout_url).await?;
        tx.commit().await?;
        Ok(view)
    }

    pub async fn select_address(
        &self,
        client_id: Uuid,
        input: SelectAddressInput,
    ) -> AppResult<CheckoutView> {
        let mut tx = self.db.begin().await?;
        let cart = lock_active_cart(&mut tx, client_id).await?;
        let (mut session, _) = load_session(&mut tx, cart.id).await?;

        let address = client_address(&mut tx, client_id, input.address_id).await?;
        session.select_address(address.id)?;
        save_session(&mut tx, &session, None).await?;
        tx.commit().await?;

        Ok(CheckoutView {
            session,
            cart,
            address: Some(address),
            qr_checkout_url: None,
        })
    }

    pub async fn select_payment_type(
        &self,
        client_id: Uuid,
        input: SelectPaymentTypeInput,
    ) -> AppResult<CheckoutView> {
        let method = input.payment_type.parse::<PaymentMethod>()?;

        let mut tx = self.db.begin().await?;

        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM payment_types WHERE code = $1 AND is_active)",
        )
        .bind(method.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if !active {
            return Err(AppError::invalid(
                "payment_type",
                "Payment type is not available",
                "El tipo de pago no está disponible",
            ));
        }

        let cart = lock_active_cart(&mut tx, client_id).await?;
        let (mut session, _) = load_session(&mut tx, cart.id).await?;
        session.select_payment_method(method)?;
        save_session(&mut tx, &session, None).await?;

        let view = self.view(&mut tx, client_id, session, cart, None).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Record card data or issue the QR, depending on the selected payment type
    pub async fn payment_details(
        &self,
        client_id: Uuid,
        input: PaymentDetailsInput,
    ) -> AppResult<PaymentDetailsResponse> {
        // The gateway call happens outside the transaction holding the cart lock
        let (method, cart_total) = {
            let mut conn = self.db.acquire().await?;
            let cart = lock_active_cart(&mut conn, client_id).await?;
            let (session, _) = load_session(&mut conn, cart.id).await?;
            if session.step < CheckoutStep::PaymentType {
                return Err(AppError::CheckoutStep(format!(
                    "cannot move from {} to {}",
                    session.step,
                    CheckoutStep::PaymentDetails
                )));
            }
            (session.payment_method, cart.total)
        };

        let mut card_last4 = None;
        let mut qr = None;
        match method {
            Some(PaymentMethod::Card) => {
                let card = input.card.ok_or_else(|| {
                    AppError::invalid("card", "Card details are required", "Debe ingresar los datos de la tarjeta")
                })?;
                validate_card(&card, Utc::now().date_naive())
                    .map_err(|m| AppError::invalid("card", m, "Datos de tarjeta inválidos"))?;
                card_last4 = Some(card.last4());
            }
            Some(PaymentMethod::Qr) => {
                let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('qr_reference_seq')")
                    .fetch_one(&self.db)
                    .await?;
                let reference = payment_reference(sequence);
                qr = Some(
                    self.qr_gateway
                        .request_qr(&reference, cart_total, &self.currency)
                        .await,
                );
            }
            Some(PaymentMethod::Cash) | None => {}
        }

        let mut tx = self.db.begin().await?;
        let cart = lock_active_cart(&mut tx, client_id).await?;
        let (mut session, _) = load_session(&mut tx, cart.id).await?;

        if session.payment_method != method {
            return Err(AppError::CheckoutStep(
                "payment type changed while entering details".to_string(),
            ));
        }

        session.record_payment_details(card_last4, qr.as_ref().map(|q| q.reference.clone()))?;
        let qr_url = qr.as_ref().map(|q| q.checkout_url.clone());
        save_session(&mut tx, &session, qr_url.as_deref()).await?;

        let checkout = self.view(&mut tx, client_id, session, cart, qr_url).await?;
        tx.commit().await?;

        Ok(PaymentDetailsResponse { checkout, qr })
    }

    /// Final review before committing
    pub async fn confirm(&self, client_id: Uuid) -> AppResult<CheckoutView> {
        let mut tx = self.db.begin().await?;
        let cart = lock_active_cart(&mut tx, client_id).await?;
        let (mut session, qr_url) = load_session(&mut tx, cart.id).await?;

        session.confirm()?;
        ensure_cart_in_stock(&mut tx, &cart).await?;
        save_session(&mut tx, &session, qr_url.as_deref()).await?;

        let view = self.view(&mut tx, client_id, session, cart, qr_url).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Commit the order: stock, order, sales note, details and payment in one transaction
    pub async fn process(&self, client_id: Uuid) -> AppResult<ProcessResponse> {
        let mut tx = self.db.begin().await?;

        let mut cart = lock_active_cart(&mut tx, client_id).await?;
        let (mut session, qr_url) = load_session(&mut tx, cart.id).await?;
        let (address_id, method) = session.ready_to_process()?;
        let lines = sale_lines_from_cart(&cart.items)?;
        let address = client_address(&mut tx, client_id, address_id).await?;

        for line in &lines {
            take_stock(&mut tx, line.product_id, line.warehouse_id, line.quantity).await?;
        }

        let total = sale_total(&lines);
        let delivery_address =
            format_address(&address.street, &address.city, address.reference.as_deref());

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (client_id, cart_id, address_id, delivery_address, total, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(cart.id)
        .bind(address.id)
        .bind(&delivery_address)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        let sales_note_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales_notes (order_id, client_id, total, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id
            "#,
        )
        .bind(order_id)
        .bind(client_id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_details (sales_note_id, product_id, warehouse_id, quantity, unit_price, total)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(sales_note_id)
            .bind(line.product_id)
            .bind(line.warehouse_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total)
            .execute(&mut *tx)
            .await?;
        }

        let reference = match method {
            PaymentMethod::Qr => session.qr_reference.clone(),
            _ => None,
        };

        sqlx::query(
            r#"
            INSERT INTO payments (sales_note_id, payment_type_id, amount, status, reference, card_last4)
            SELECT $1, id, $2, 'pending', $3, $4 FROM payment_types WHERE code = $5
            "#,
        )
        .bind(sales_note_id)
        .bind(total)
        .bind(&reference)
        .bind(&session.card_last4)
        .bind(method.as_str())
        .execute(&mut *tx)
        .await?;

        let outcome = self.approver.decide(method);
        let (payment_status, note_status, order_status) = outcome.resulting_statuses();

        if outcome != ApprovalOutcome::AwaitingConfirmation {
            sqlx::query(
                r#"
                UPDATE payments
                SET status = $1, paid_at = CASE WHEN $1 = 'paid' THEN NOW() END, updated_at = NOW()
                WHERE sales_note_id = $2
                "#,
            )
            .bind(payment_status.as_str())
            .bind(sales_note_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE sales_notes SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(note_status.as_str())
                .bind(sales_note_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(order_status.as_str())
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
        }

        if outcome.keeps_stock_decrement() {
            for line in &lines {
                record_movement(
                    &mut tx,
                    NewMovement {
                        product_id: line.product_id,
                        warehouse_id: line.warehouse_id,
                        kind: MovementKind::Sale,
                        quantity: -line.quantity,
                        reference_type: Some("sales_note"),
                        reference_id: Some(sales_note_id),
                        reason: None,
                        created_by: None,
                    },
                )
                .await?;
            }

            cart.mark_processed()?;
            sqlx::query("UPDATE carts SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(cart.status.as_str())
                .bind(cart.id)
                .execute(&mut *tx)
                .await?;
        } else {
            // Declined: the units go back, the cart stays open for another attempt
            for line in &lines {
                put_stock(&mut tx, line.product_id, line.warehouse_id, line.quantity).await?;
            }
        }

        session.complete(outcome)?;
        save_session(&mut tx, &session, qr_url.as_deref()).await?;

        let sale = load_sale(&mut tx, sales_note_id).await?;
        tx.commit().await?;

        match outcome {
            ApprovalOutcome::Declined => tracing::warn!(
                %sales_note_id,
                %client_id,
                %method,
                "Payment declined, sale cancelled"
            ),
            _ => tracing::info!(
                %sales_note_id,
                %client_id,
                %method,
                %total,
                ?outcome,
                "Order committed"
            ),
        }

        Ok(ProcessResponse {
            outcome,
            sale,
            next_step: session.step,
        })
    }

    async fn view(
        &self,
        conn: &mut PgConnection,
        client_id: Uuid,
        session: CheckoutSession,
        cart: Cart,
        qr_checkout_url: Option<String>,
    ) -> AppResult<CheckoutView> {
        let address = match session.address_id {
            Some(address_id) => Some(client_address(conn, client_id, address_id).await?),
            None => None,
        };

        Ok(CheckoutView {
            session,
            cart,
            address,
            qr_checkout_url,
        })
    }
}
