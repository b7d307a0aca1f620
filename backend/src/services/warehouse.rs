//! Warehouse management service

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult};
use crate::models::{ListQuery, Warehouse};
use crate::services::cart::refresh_carts;
use shared::PaginatedResponse;

const SORTABLE: &[&str] = &["name", "created_at"];

#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Input for creating or updating a warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct WarehouseInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

impl WarehouseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<PaginatedResponse<Warehouse>> {
        let pagination = query.pagination();
        let search = query.search_pattern();

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM warehouses WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR address ILIKE $1)",
        )
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let sql = format!(
            r#"
            SELECT id, name, address, created_at, updated_at
            FROM warehouses
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR address ILIKE $1)
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            query.order_by(SORTABLE, "name")
        );

        let warehouses = sqlx::query_as::<_, Warehouse>(&sql)
            .bind(&search)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        Ok(PaginatedResponse::new(warehouses, pagination, total as u64))
    }

    pub async fn get(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, Warehouse>(
            "SELECT id, name, address, created_at, updated_at FROM warehouses WHERE id = $1",
        )
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    pub async fn create(&self, input: WarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;

        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (name, address)
            VALUES ($1, $2)
            RETURNING id, name, address, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.address)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "name"))?;

        tracing::info!(warehouse_id = %warehouse.id, "Created warehouse");
        Ok(warehouse)
    }

    pub async fn update(&self, warehouse_id: Uuid, input: WarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;

        sqlx::query_as::<_, Warehouse>(
            r#"
            UPDATE warehouses
            SET name = $1, address = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, name, address, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.address)
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "name"))?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Delete a warehouse that holds no stock and has no history
    pub async fn delete(&self, warehouse_id: Uuid) -> AppResult<()> {
        let in_use = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM stocks WHERE warehouse_id = $1 AND quantity > 0)
                OR EXISTS(SELECT 1 FROM purchase_notes WHERE warehouse_id = $1)
                OR EXISTS(SELECT 1 FROM sale_details WHERE warehouse_id = $1)
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if in_use {
            return Err(AppError::in_use(
                "warehouse",
                "Warehouse holds inventory and cannot be deleted",
                "El almacén tiene inventario y no se puede eliminar",
            ));
        }

        let mut tx = self.db.begin().await?;

        let carts = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM cart_items WHERE warehouse_id = $1 RETURNING cart_id",
        )
        .bind(warehouse_id)
        .fetch_all(&mut *tx)
        .await?;
        refresh_carts(&mut tx, &carts).await?;

        for statement in [
            "DELETE FROM stock_movements WHERE warehouse_id = $1",
            "DELETE FROM stocks WHERE warehouse_id = $1",
        ] {
            sqlx::query(statement)
                .bind(warehouse_id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        tx.commit().await?;

        tracing::info!(%warehouse_id, "Deleted warehouse");
        Ok(())
    }
}
