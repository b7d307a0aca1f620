//! Stock service: per-warehouse levels, adjustments, transfers and the movement ledger
//!
//! The free functions take a connection so that purchase, checkout and sales
//! services can move stock inside their own transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ListQuery, MovementKind, StockTransfer};
use shared::{apply_stock_delta, DomainError, PaginatedResponse};

const SORTABLE: &[&str] = &["product_name", "warehouse_name", "quantity", "updated_at"];

#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    low_stock_threshold: i32,
}

/// Stock of one (product, warehouse) pairing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry of a stock change
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub kind: String,
    pub quantity: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Stock list filters
#[derive(Debug, Default, Deserialize)]
pub struct StockFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

/// Manual correction of a stock level
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Signed change in units
    pub delta: i32,
    pub reason: String,
}

/// Move units between two warehouses
#[derive(Debug, Deserialize)]
pub struct TransferStockInput {
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub quantity: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransferResult {
    pub source: StockLevel,
    pub destination: StockLevel,
}

/// A movement about to be written to the ledger
#[derive(Debug)]
pub struct NewMovement<'a> {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub kind: MovementKind,
    /// Signed change in units
    pub quantity: i32,
    pub reference_type: Option<&'a str>,
    pub reference_id: Option<Uuid>,
    pub reason: Option<&'a str>,
    pub created_by: Option<Uuid>,
}

/// Take `quantity` units from a pairing, failing if it holds fewer
pub async fn take_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    if quantity <= 0 {
        return Err(DomainError::InvalidQuantity(quantity).into());
    }

    // Conditional decrement; the row lock serialises concurrent checkouts
    let result = sqlx::query(
        r#"
        UPDATE stocks
        SET quantity = quantity - $3, updated_at = NOW()
        WHERE product_id = $1 AND warehouse_id = $2 AND quantity >= $3
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available = current_quantity(conn, product_id, warehouse_id).await?;
        return Err(DomainError::InsufficientStock {
            requested: quantity,
            available,
        }
        .into());
    }

    Ok(())
}

/// Add `quantity` units to a pairing, creating the stock row if needed
pub async fn put_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    if quantity <= 0 {
        return Err(DomainError::InvalidQuantity(quantity).into());
    }

    sqlx::query(
        r#"
        INSERT INTO stocks (product_id, warehouse_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (product_id, warehouse_id)
        DO UPDATE SET quantity = stocks.quantity + EXCLUDED.quantity, updated_at = NOW()
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Current units of a pairing, zero when no row exists
pub async fn current_quantity(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> AppResult<i32> {
    let quantity = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM stocks WHERE product_id = $1 AND warehouse_id = $2",
    )
    .bind(product_id)
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity.unwrap_or(0))
}

/// Append a movement to the ledger
pub async fn record_movement(conn: &mut PgConnection, movement: NewMovement<'_>) -> AppResult<()> {
    if !movement.kind.accepts(movement.quantity) {
        return Err(DomainError::validation("quantity", "sign does not match the movement kind").into());
    }

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            product_id, warehouse_id, kind, quantity, reference_type, reference_id, reason, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(movement.product_id)
    .bind(movement.warehouse_id)
    .bind(movement.kind.as_str())
    .bind(movement.quantity)
    .bind(movement.reference_type)
    .bind(movement.reference_id)
    .bind(movement.reason)
    .bind(movement.created_by)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        product_id = %movement.product_id,
        warehouse_id = %movement.warehouse_id,
        kind = %movement.kind,
        quantity = movement.quantity,
        "Recorded stock movement"
    );
    Ok(())
}

impl StockService {
    pub fn new(db: PgPool, low_stock_threshold: i32) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    /// List stock levels, optionally for one product or warehouse
    pub async fn list(
        &self,
        query: &ListQuery,
        filter: &StockFilter,
    ) -> AppResult<PaginatedResponse<StockLevel>> {
        let pagination = query.pagination();
        let search = query.search_pattern();
        let from = r#"
            FROM stocks s
            JOIN products p ON p.id = s.product_id
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE ($1::UUID IS NULL OR s.product_id = $1)
              AND ($2::UUID IS NULL OR s.warehouse_id = $2)
              AND ($3::TEXT IS NULL OR p.name ILIKE $3 OR w.name ILIKE $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", from))
            .bind(filter.product_id)
            .bind(filter.warehouse_id)
            .bind(&search)
            .fetch_one(&self.db)
            .await?;

        let sql = format!(
            r#"
            SELECT s.product_id, p.name AS product_name, s.warehouse_id,
                   w.name AS warehouse_name, s.quantity, s.updated_at
            {}
            ORDER BY {}
            LIMIT $4 OFFSET $5
            "#,
            from,
            query.order_by(SORTABLE, "product_name")
        );

        let levels = sqlx::query_as::<_, StockLevel>(&sql)
            .bind(filter.product_id)
            .bind(filter.warehouse_id)
            .bind(&search)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        Ok(PaginatedResponse::new(levels, pagination, total as u64))
    }

    /// Pairings at or below the low-stock threshold
    pub async fn low_stock(&self, threshold: Option<i32>) -> AppResult<Vec<StockLevel>> {
        let threshold = threshold.unwrap_or(self.low_stock_threshold).max(0);

        let levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT s.product_id, p.name AS product_name, s.warehouse_id,
                   w.name AS warehouse_name, s.quantity, s.updated_at
            FROM stocks s
            JOIN products p ON p.id = s.product_id
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE p.is_active = true AND s.quantity <= $1
            ORDER BY s.quantity, p.name
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        Ok(levels)
    }

    /// Ledger of stock movements, newest first
    pub async fn movements(
        &self,
        query: &ListQuery,
        filter: &StockFilter,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let pagination = query.pagination();
        let condition = r#"
            WHERE ($1::UUID IS NULL OR m.product_id = $1)
              AND ($2::UUID IS NULL OR m.warehouse_id = $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_movements m {}",
            condition
        ))
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .fetch_one(&self.db)
        .await?;

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT m.id, m.product_id, p.name AS product_name, m.warehouse_id,
                   w.name AS warehouse_name, m.kind, m.quantity, m.reference_type,
                   m.reference_id, m.reason, m.created_by, m.created_at
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            JOIN warehouses w ON w.id = m.warehouse_id
            {}
            ORDER BY m.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            condition
        ))
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(movements, pagination, total as u64))
    }

    /// Apply a signed correction to a pairing
    pub async fn adjust(&self, user_id: Uuid, input: AdjustStockInput) -> AppResult<StockLevel> {
        if input.delta == 0 {
            return Err(AppError::invalid(
                "delta",
                "Adjustment cannot be zero",
                "El ajuste no puede ser cero",
            ));
        }
        if input.reason.trim().is_empty() {
            return Err(AppError::invalid(
                "reason",
                "A reason is required",
                "Debe indicar un motivo",
            ));
        }
        self.ensure_pairing_exists(input.product_id, input.warehouse_id)
            .await?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM stocks WHERE product_id = $1 AND warehouse_id = $2 FOR UPDATE",
        )
        .bind(input.product_id)
        .bind(input.warehouse_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        let next = apply_stock_delta(current, input.delta)?;

        sqlx::query(
            r#"
            INSERT INTO stocks (product_id, warehouse_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(input.product_id)
        .bind(input.warehouse_id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        record_movement(
            &mut tx,
            NewMovement {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
                kind: MovementKind::Adjustment,
                quantity: input.delta,
                reference_type: None,
                reference_id: None,
                reason: Some(input.reason.trim()),
                created_by: Some(user_id),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %input.product_id,
            warehouse_id = %input.warehouse_id,
            from = current,
            to = next,
            "Adjusted stock"
        );

        self.level(input.product_id, input.warehouse_id).await
    }

    /// Move units from one warehouse to another in a single transaction
    pub async fn transfer(&self, user_id: Uuid, input: TransferStockInput) -> AppResult<TransferResult> {
        let transfer = StockTransfer::new(
            input.product_id,
            input.from_warehouse_id,
            input.to_warehouse_id,
            input.quantity,
        )?;
        self.ensure_pairing_exists(transfer.product_id, transfer.to_warehouse_id)
            .await?;

        let mut tx = self.db.begin().await?;

        take_stock(
            &mut tx,
            transfer.product_id,
            transfer.from_warehouse_id,
            transfer.quantity,
        )
        .await?;
        put_stock(
            &mut tx,
            transfer.product_id,
            transfer.to_warehouse_id,
            transfer.quantity,
        )
        .await?;

        let reason = input.reason.as_deref();
        for (warehouse_id, kind, quantity) in [
            (transfer.from_warehouse_id, MovementKind::TransferOut, -transfer.quantity),
            (transfer.to_warehouse_id, MovementKind::TransferIn, transfer.quantity),
        ] {
            record_movement(
                &mut tx,
                NewMovement {
                    product_id: transfer.product_id,
                    warehouse_id,
                    kind,
                    quantity,
                    reference_type: None,
                    reference_id: None,
                    reason,
                    created_by: Some(user_id),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            product_id = %transfer.product_id,
            from = %transfer.from_warehouse_id,
            to = %transfer.to_warehouse_id,
            quantity = transfer.quantity,
            "Transferred stock"
        );

        Ok(TransferResult {
            source: self
                .level(transfer.product_id, transfer.from_warehouse_id)
                .await?,
            destination: self
                .level(transfer.product_id, transfer.to_warehouse_id)
                .await?,
        })
    }

    async fn level(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<StockLevel> {
        sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT s.product_id, p.name AS product_name, s.warehouse_id,
                   w.name AS warehouse_name, s.quantity, s.updated_at
            FROM stocks s
            JOIN products p ON p.id = s.product_id
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE s.product_id = $1 AND s.warehouse_id = $2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock".to_string()))
    }

    async fn ensure_pairing_exists(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<()> {
        let (product, warehouse) = sqlx::query_as::<_, (bool, bool)>(
            r#"
            SELECT EXISTS(SELECT 1 FROM products WHERE id = $1),
                   EXISTS(SELECT 1 FROM warehouses WHERE id = $2)
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if !product {
            return Err(AppError::NotFound("Product".to_string()));
        }
        if !warehouse {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }
        Ok(())
    }
}
