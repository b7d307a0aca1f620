//! Sales service: orders, sales notes and their cancellation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ListQuery, MovementKind, OrderStatus, PaymentStatus, SalesNoteStatus};
use crate::services::payment::{payment_for_sale, Payment};
use crate::services::stock::{put_stock, record_movement, NewMovement};
use shared::{PaginatedResponse, SortDirection};

const SORTABLE: &[&str] = &["number", "total", "created_at"];

#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

/// Customer order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub client_id: Uuid,
    pub address_id: Option<Uuid>,
    pub delivery_address: String,
    pub order_date: DateTime<Utc>,
    pub total: Decimal,
    pub status: String,
}

/// Sales note with its client
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesNote {
    pub id: Uuid,
    pub number: i64,
    pub order_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub total: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Line of a sales note
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// A sale with everything attached to it
#[derive(Debug, Clone, Serialize)]
pub struct SaleView {
    pub order: Order,
    pub sales_note: SalesNote,
    pub details: Vec<SaleDetail>,
    pub payment: Payment,
}

/// Sales note list filters
#[derive(Debug, Default, Deserialize)]
pub struct SalesFilter {
    pub status: Option<SalesNoteStatus>,
    pub client_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct LockedSale {
    status: String,
    order_id: Uuid,
    order_status: String,
    payment_id: Uuid,
    payment_status: String,
}

const SALES_NOTE_SELECT: &str = r#"
    SELECT sn.id, sn.number, sn.order_id, sn.client_id, c.name AS client_name,
           sn.total, sn.status, sn.created_at, sn.updated_at
    FROM sales_notes sn
    JOIN clients c ON c.id = sn.client_id
"#;

/// Put every line of a sales note back into its warehouse
pub async fn restock_sale(
    conn: &mut PgConnection,
    sales_note_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<()> {
    let lines = sqlx::query_as::<_, (Uuid, Uuid, i32)>(
        "SELECT product_id, warehouse_id, quantity FROM sale_details WHERE sales_note_id = $1",
    )
    .bind(sales_note_id)
    .fetch_all(&mut *conn)
    .await?;

    for (product_id, warehouse_id, quantity) in lines {
        put_stock(conn, product_id, warehouse_id, quantity).await?;
        record_movement(
            conn,
            NewMovement {
                product_id,
                warehouse_id,
                kind: MovementKind::SaleCancel,
                quantity,
                reference_type: Some("sales_note"),
                reference_id: Some(sales_note_id),
                reason: None,
                created_by: user_id,
            },
        )
        .await?;
    }

    Ok(())
}

/// Load a full sale on the given connection
pub async fn load_sale(conn: &mut PgConnection, sales_note_id: Uuid) -> AppResult<SaleView> {
    let sales_note = sqlx::query_as::<_, SalesNote>(&format!("{} WHERE sn.id = $1", SALES_NOTE_SELECT))
        .bind(sales_note_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales note".to_string()))?;

    let order = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, client_id, address_id, delivery_address, order_date, total, status
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(sales_note.order_id)
    .fetch_one(&mut *conn)
    .await?;

    let details = sqlx::query_as::<_, SaleDetail>(
        r#"
        SELECT sd.id, sd.product_id, p.name AS product_name, sd.warehouse_id,
               sd.quantity, sd.unit_price, sd.total
        FROM sale_details sd
        JOIN products p ON p.id = sd.product_id
        WHERE sd.sales_note_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(sales_note_id)
    .fetch_all(&mut *conn)
    .await?;

    let payment = payment_for_sale(conn, sales_note_id).await?;

    Ok(SaleView {
        order,
        sales_note,
        details,
        payment,
    })
}

impl SalesService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List sales notes with filters, search and pagination
    pub async fn list(
        &self,
        query: &ListQuery,
        filter: &SalesFilter,
    ) -> AppResult<PaginatedResponse<SalesNote>> {
        let pagination = query.pagination();
        let search = query.search_pattern();
        let status = filter.status.map(|s| s.as_str());
        let condition = r#"
            WHERE ($1::TEXT IS NULL OR sn.status = $1)
              AND ($2::UUID IS NULL OR sn.client_id = $2)
              AND ($3::DATE IS NULL OR sn.created_at::DATE >= $3)
              AND ($4::DATE IS NULL OR sn.created_at::DATE <= $4)
              AND ($5::TEXT IS NULL OR c.name ILIKE $5 OR c.document_number ILIKE $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM sales_notes sn JOIN clients c ON c.id = sn.client_id {}",
            condition
        ))
        .bind(status)
        .bind(filter.client_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let notes = sqlx::query_as::<_, SalesNote>(&format!(
            "{} {} ORDER BY sn.{} LIMIT $6 OFFSET $7",
            SALES_NOTE_SELECT,
            condition,
            query.order_by(SORTABLE, "created_at")
        ))
        .bind(status)
        .bind(filter.client_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(notes, pagination, total as u64))
    }

    pub async fn get(&self, sales_note_id: Uuid) -> AppResult<SaleView> {
        let mut conn = self.db.acquire().await?;
        load_sale(&mut conn, sales_note_id).await
    }

    /// Orders of a customer, newest first
    pub async fn client_orders(
        &self,
        client_id: Uuid,
        query: &ListQuery,
    ) -> AppResult<PaginatedResponse<SalesNote>> {
        let filter = SalesFilter {
            client_id: Some(client_id),
            ..Default::default()
        };
        let query = ListQuery {
            direction: query.direction.or(Some(SortDirection::Desc)),
            ..query.clone()
        };
        self.list(&query, &filter).await
    }

    /// A customer's own order, looked up by order id
    pub async fn client_order(&self, client_id: Uuid, order_id: Uuid) -> AppResult<SaleView> {
        let mut conn = self.db.acquire().await?;

        let sales_note_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM sales_notes WHERE order_id = $1 AND client_id = $2",
        )
        .bind(order_id)
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        load_sale(&mut conn, sales_note_id).await
    }

    /// Cancel a sale, returning its units to stock
    pub async fn cancel(&self, user_id: Uuid, sales_note_id: Uuid) -> AppResult<SaleView> {
        let mut tx = self.db.begin().await?;

        // Same rows as the QR callback locks, so the two cannot deadlock
        let sale = sqlx::query_as::<_, LockedSale>(
            r#"
            SELECT sn.status, sn.order_id, o.status AS order_status,
                   p.id AS payment_id, p.status AS payment_status
            FROM payments p
            JOIN sales_notes sn ON sn.id = p.sales_note_id
            JOIN orders o ON o.id = sn.order_id
            WHERE sn.id = $1
            FOR UPDATE OF p, sn, o
            "#,
        )
        .bind(sales_note_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales note".to_string()))?;

        let note_status = sale
            .status
            .parse::<SalesNoteStatus>()?
            .transition(SalesNoteStatus::Cancelled)?;
        let order_status = sale
            .order_status
            .parse::<OrderStatus>()?
            .transition(OrderStatus::Cancelled)?;

        sqlx::query("UPDATE sales_notes SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(note_status.as_str())
            .bind(sales_note_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(order_status.as_str())
            .bind(sale.order_id)
            .execute(&mut *tx)
            .await?;

        let payment_status = sale.payment_status.parse::<PaymentStatus>()?;
        if let Some(next) = payment_status.after_cancellation() {
            sqlx::query("UPDATE payments SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(payment_status.transition(next)?.as_str())
                .bind(sale.payment_id)
                .execute(&mut *tx)
                .await?;
        }

        restock_sale(&mut tx, sales_note_id, Some(user_id)).await?;

        let view = load_sale(&mut tx, sales_note_id).await?;
        tx.commit().await?;

        tracing::info!(%sales_note_id, %user_id, "Cancelled sale");
        Ok(view)
    }
}
