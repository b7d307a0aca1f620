//! Shopping cart service
//!
//! Cart rules live in the shared `Cart` aggregate; this service loads it under a
//! row lock, applies the change and writes back the touched line and total.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Cart, CartLine, CartStatus, LineChange};
use crate::services::checkout::reset_checkouts;
use crate::services::stock::current_quantity;

#[derive(Clone)]
pub struct CartService {
    db: PgPool,
}

/// Input for adding a product to the cart
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
}

/// Input for changing the quantity of a line
#[derive(Debug, Deserialize)]
pub struct UpdateItemInput {
    pub quantity: i32,
}

#[derive(Debug, FromRow)]
struct CartRow {
    id: Uuid,
    client_id: Uuid,
    status: String,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ProductSnapshot {
    name: String,
    sale_price: Decimal,
    is_active: bool,
}

/// Load the client's active cart, creating it on first use, and lock it for the transaction
pub async fn lock_active_cart(conn: &mut PgConnection, client_id: Uuid) -> AppResult<Cart> {
    sqlx::query(
        r#"
        INSERT INTO carts (client_id) VALUES ($1)
        ON CONFLICT (client_id) WHERE status = 'active' DO NOTHING
        "#,
    )
    .bind(client_id)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, CartRow>(
        r#"
        SELECT id, client_id, status, total, created_at, updated_at
        FROM carts
        WHERE client_id = $1 AND status = 'active'
        FOR UPDATE
        "#,
    )
    .bind(client_id)
    .fetch_one(&mut *conn)
    .await?;

    load_cart(conn, row).await
}

async fn load_cart(conn: &mut PgConnection, row: CartRow) -> AppResult<Cart> {
    let items = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.id, ci.product_id, ci.warehouse_id, p.name AS product_name,
               ci.quantity, ci.unit_price, ci.subtotal
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY p.name, ci.id
        "#,
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Cart {
        id: row.id,
        client_id: row.client_id,
        status: row.status.parse::<CartStatus>()?,
        items,
        total: row.total,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Write a line change and the recomputed total; any open checkout restarts
async fn persist_change(conn: &mut PgConnection, cart: &Cart, change: &LineChange) -> AppResult<()> {
    match change {
        LineChange::Inserted(line) => {
            sqlx::query(
                r#"
                INSERT INTO cart_items (id, cart_id, product_id, warehouse_id, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(line.id)
            .bind(cart.id)
            .bind(line.product_id)
            .bind(line.warehouse_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.subtotal)
            .execute(&mut *conn)
            .await?;
        }
        LineChange::Updated(line) => {
            sqlx::query("UPDATE cart_items SET quantity = $1, subtotal = $2 WHERE id = $3 AND cart_id = $4")
                .bind(line.quantity)
                .bind(line.subtotal)
                .bind(line.id)
                .bind(cart.id)
                .execute(&mut *conn)
                .await?;
        }
        LineChange::Removed(line_id) => {
            sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
                .bind(line_id)
                .bind(cart.id)
                .execute(&mut *conn)
                .await?;
        }
    }

    store_total(conn, cart).await?;
    reset_checkouts(conn, &[cart.id]).await
}

async fn store_total(conn: &mut PgConnection, cart: &Cart) -> AppResult<()> {
    sqlx::query("UPDATE carts SET total = $1, updated_at = NOW() WHERE id = $2")
        .bind(cart.total)
        .bind(cart.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Carts lost lines they did not remove themselves (a product or warehouse was
/// deleted): recompute their totals and restart their checkouts
pub async fn refresh_carts(conn: &mut PgConnection, cart_ids: &[Uuid]) -> AppResult<()> {
    if cart_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE carts c
        SET total = COALESCE((SELECT SUM(ci.subtotal) FROM cart_items ci WHERE ci.cart_id = c.id), 0),
            updated_at = NOW()
        WHERE c.id = ANY($1)
        "#,
    )
    .bind(cart_ids)
    .execute(&mut *conn)
    .await?;

    reset_checkouts(conn, cart_ids).await?;

    tracing::info!(carts = cart_ids.len(), "Refreshed carts after removing lines");
    Ok(())
}

impl CartService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The client's active cart
    pub async fn get(&self, client_id: Uuid) -> AppResult<Cart> {
        let mut tx = self.db.begin().await?;
        let cart = lock_active_cart(&mut tx, client_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Add units of a stock pairing to the cart
    pub async fn add_item(&self, client_id: Uuid, input: AddItemInput) -> AppResult<Cart> {
        let mut tx = self.db.begin().await?;
        let mut cart = lock_active_cart(&mut tx, client_id).await?;

        let product = sqlx::query_as::<_, ProductSnapshot>(
            "SELECT name, sale_price, is_active FROM products WHERE id = $1",
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let available = current_quantity(&mut tx, input.product_id, input.warehouse_id).await?;

        let change = cart.add_item(
            input.product_id,
            input.warehouse_id,
            &product.name,
            input.quantity,
            product.sale_price,
            available,
        )?;
        persist_change(&mut tx, &cart, &change).await?;

        tx.commit().await?;

        tracing::debug!(cart_id = %cart.id, product_id = %input.product_id, "Added item to cart");
        Ok(cart)
    }

    /// Change the quantity of a line; zero removes it
    pub async fn update_item(
        &self,
        client_id: Uuid,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> AppResult<Cart> {
        let mut tx = self.db.begin().await?;
        let mut cart = lock_active_cart(&mut tx, client_id).await?;

        let (product_id, warehouse_id) = cart
            .line(item_id)
            .map(|l| (l.product_id, l.warehouse_id))
            .ok_or_else(|| AppError::NotFound("Cart item".to_string()))?;
        let available = current_quantity(&mut tx, product_id, warehouse_id).await?;

        let change = cart.set_quantity(item_id, input.quantity, available)?;
        persist_change(&mut tx, &cart, &change).await?;

        tx.commit().await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, client_id: Uuid, item_id: Uuid) -> AppResult<Cart> {
        let mut tx = self.db.begin().await?;
        let mut cart = lock_active_cart(&mut tx, client_id).await?;

        let change = cart.remove_item(item_id)?;
        persist_change(&mut tx, &cart, &change).await?;

        tx.commit().await?;
        Ok(cart)
    }

    /// Remove every line from the cart
    pub async fn clear(&self, client_id: Uuid) -> AppResult<Cart> {
        let mut tx = self.db.begin().await?;
        let mut cart = lock_active_cart(&mut tx, client_id).await?;

        cart.clear()?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.id)
            .execute(&mut *tx)
            .await?;
        store_total(&mut tx, &cart).await?;
        reset_checkouts(&mut tx, &[cart.id]).await?;

        tx.commit().await?;
        Ok(cart)
    }
}
