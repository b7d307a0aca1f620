//! Purchase note service: goods received from providers

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ListQuery, MovementKind, PurchaseLine, PurchaseNote};
use crate::services::stock::{put_stock, record_movement, NewMovement};
use shared::{purchase_total, PaginatedResponse};

const SORTABLE: &[&str] = &["purchase_date", "total", "created_at"];

#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// Input for registering a purchase note
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub provider_id: Uuid,
    pub warehouse_id: Uuid,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub details: Vec<PurchaseLine>,
}

/// Purchase note list filters
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseFilter {
    pub provider_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Purchase note row with provider and warehouse names
#[derive(Debug, Serialize, FromRow)]
pub struct PurchaseNoteSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub note: PurchaseNote,
    pub provider_name: String,
    pub warehouse_name: String,
}

/// A line of a stored purchase note
#[derive(Debug, Serialize, FromRow)]
pub struct PurchaseDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub total: Decimal,
}

/// Purchase note with its lines
#[derive(Debug, Serialize)]
pub struct PurchaseNoteWithDetails {
    #[serde(flatten)]
    pub summary: PurchaseNoteSummary,
    pub details: Vec<PurchaseDetail>,
}

impl PurchaseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        query: &ListQuery,
        filter: &PurchaseFilter,
    ) -> AppResult<PaginatedResponse<PurchaseNoteSummary>> {
        let pagination = query.pagination();
        let search = query.search_pattern();
        let from = r#"
            FROM purchase_notes pn
            JOIN providers pr ON pr.id = pn.provider_id
            JOIN warehouses w ON w.id = pn.warehouse_id
            WHERE ($1::UUID IS NULL OR pn.provider_id = $1)
              AND ($2::UUID IS NULL OR pn.warehouse_id = $2)
              AND ($3::DATE IS NULL OR pn.purchase_date >= $3)
              AND ($4::DATE IS NULL OR pn.purchase_date <= $4)
              AND ($5::TEXT IS NULL OR pr.name ILIKE $5 OR pn.notes ILIKE $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", from))
            .bind(filter.provider_id)
            .bind(filter.warehouse_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(&search)
            .fetch_one(&self.db)
            .await?;

        let order = query.order_by(SORTABLE, "purchase_date");
        let notes = sqlx::query_as::<_, PurchaseNoteSummary>(&format!(
            r#"
            SELECT pn.id, pn.provider_id, pn.warehouse_id, pn.purchase_date, pn.total,
                   pn.notes, pn.created_at, pr.name AS provider_name, w.name AS warehouse_name
            {}
            ORDER BY pn.{}
            LIMIT $6 OFFSET $7
            "#,
            from, order
        ))
        .bind(filter.provider_id)
        .bind(filter.warehouse_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(notes, pagination, total as u64))
    }

    pub async fn get(&self, purchase_id: Uuid) -> AppResult<PurchaseNoteWithDetails> {
        let summary = sqlx::query_as::<_, PurchaseNoteSummary>(
            r#"
            SELECT pn.id, pn.provider_id, pn.warehouse_id, pn.purchase_date, pn.total,
                   pn.notes, pn.created_at, pr.name AS provider_name, w.name AS warehouse_name
            FROM purchase_notes pn
            JOIN providers pr ON pr.id = pn.provider_id
            JOIN warehouses w ON w.id = pn.warehouse_id
            WHERE pn.id = $1
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase note".to_string()))?;

        let details = sqlx::query_as::<_, PurchaseDetail>(
            r#"
            SELECT pd.id, pd.product_id, p.name AS product_name, pd.quantity, pd.unit_cost, pd.total
            FROM purchase_details pd
            JOIN products p ON p.id = pd.product_id
            WHERE pd.purchase_note_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseNoteWithDetails { summary, details })
    }

    /// Register a purchase note and receive its goods into the warehouse
    pub async fn create(&self, user_id: Uuid, input: CreatePurchaseInput) -> AppResult<PurchaseNoteWithDetails> {
        let total = purchase_total(&input.details)?;

        let (provider_ok, warehouse_ok) = sqlx::query_as::<_, (bool, bool)>(
            r#"
            SELECT EXISTS(SELECT 1 FROM providers WHERE id = $1),
                   EXISTS(SELECT 1 FROM warehouses WHERE id = $2)
            "#,
        )
        .bind(input.provider_id)
        .bind(input.warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if !provider_ok {
            return Err(AppError::invalid("provider_id", "Provider does not exist", "El proveedor no existe"));
        }
        if !warehouse_ok {
            return Err(AppError::invalid("warehouse_id", "Warehouse does not exist", "El almacén no existe"));
        }

        let product_ids: Vec<Uuid> = input.details.iter().map(|d| d.product_id).collect();
        let known = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT id) FROM products WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_one(&self.db)
        .await?;

        let mut distinct = product_ids.clone();
        distinct.sort();
        distinct.dedup();
        if known != distinct.len() as i64 {
            return Err(AppError::invalid(
                "details",
                "A purchase line references an unknown product",
                "Una línea de compra hace referencia a un producto inexistente",
            ));
        }

        let purchase_date = input.purchase_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let purchase_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_notes (provider_id, warehouse_id, purchase_date, total, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(input.provider_id)
        .bind(input.warehouse_id)
        .bind(purchase_date)
        .bind(total)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.details {
            sqlx::query(
                r#"
                INSERT INTO purchase_details (purchase_note_id, product_id, quantity, unit_cost, total)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(purchase_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_cost)
            .bind(line.total()?)
            .execute(&mut *tx)
            .await?;

            put_stock(&mut tx, line.product_id, input.warehouse_id, line.quantity).await?;

            record_movement(
                &mut tx,
                NewMovement {
                    product_id: line.product_id,
                    warehouse_id: input.warehouse_id,
                    kind: MovementKind::Purchase,
                    quantity: line.quantity,
                    reference_type: Some("purchase_note"),
                    reference_id: Some(purchase_id),
                    reason: None,
                    created_by: Some(user_id),
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            %purchase_id,
            provider_id = %input.provider_id,
            lines = input.details.len(),
            %total,
            "Registered purchase note"
        );

        self.get(purchase_id).await
    }
}
