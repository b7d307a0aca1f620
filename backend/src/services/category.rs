//! Category management service

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult};
use crate::models::{Category, ListQuery};
use shared::PaginatedResponse;

const SORTABLE: &[&str] = &["name", "created_at"];

/// Category service
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

/// Input for creating or updating a category
#[derive(Debug, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List categories with search, sort and pagination
    pub async fn list(&self, query: &ListQuery) -> AppResult<PaginatedResponse<Category>> {
        let pagination = query.pagination();
        let search = query.search_pattern();

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
        )
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let sql = format!(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM categories
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            query.order_by(SORTABLE, "name")
        );

        let categories = sqlx::query_as::<_, Category>(&sql)
            .bind(&search)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        Ok(PaginatedResponse::new(categories, pagination, total as u64))
    }

    pub async fn get(&self, category_id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    pub async fn create(&self, input: CategoryInput) -> AppResult<Category> {
        input.validate()?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "name"))?;

        tracing::info!(category_id = %category.id, name = %category.name, "Created category");
        Ok(category)
    }

    pub async fn update(&self, category_id: Uuid, input: CategoryInput) -> AppResult<Category> {
        input.validate()?;

        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $1, description = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(category_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "name"))?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    /// Delete a category that no product references
    pub async fn delete(&self, category_id: Uuid) -> AppResult<()> {
        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE category_id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        if in_use {
            return Err(AppError::in_use(
                "category",
                "Category has products and cannot be deleted",
                "La categoría tiene productos y no se puede eliminar",
            ));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }

        tracing::info!(%category_id, "Deleted category");
        Ok(())
    }
}
