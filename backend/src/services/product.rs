//! Product catalog service: back-office CRUD and storefront browsing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ListQuery, Product, WarehouseAvailability};
use crate::services::cart::refresh_carts;
use shared::{total_available, validate_product_fields, PaginatedResponse};

const SORTABLE: &[&str] = &["name", "sale_price", "created_at"];

const PRODUCT_COLUMNS: &str = "id, category_id, name, brand, description, volume_ml, \
     alcohol_percent, sale_price, purchase_price, image_url, is_active, created_at, updated_at";

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product list filters
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Input for creating or updating a product
#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub volume_ml: i32,
    #[serde(default)]
    pub alcohol_percent: Decimal,
    pub sale_price: Decimal,
    pub purchase_price: Decimal,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// A product as shown in the storefront
#[derive(Debug, Serialize)]
pub struct StoreProduct {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub available: i32,
    pub stock: Vec<WarehouseAvailability>,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products with filters, search, sort and pagination
    pub async fn list(
        &self,
        query: &ListQuery,
        filter: &ProductFilter,
    ) -> AppResult<PaginatedResponse<Product>> {
        self.list_where(query, filter.category_id, filter.is_active).await
    }

    async fn list_where(
        &self,
        query: &ListQuery,
        category_id: Option<Uuid>,
        is_active: Option<bool>,
    ) -> AppResult<PaginatedResponse<Product>> {
        let pagination = query.pagination();
        let search = query.search_pattern();
        let condition = r#"
            ($1::TEXT IS NULL OR name ILIKE $1 OR brand ILIKE $1)
            AND ($2::UUID IS NULL OR category_id = $2)
            AND ($3::BOOLEAN IS NULL OR is_active = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM products WHERE {}",
            condition
        ))
        .bind(&search)
        .bind(category_id)
        .bind(is_active)
        .fetch_one(&self.db)
        .await?;

        let sql = format!(
            "SELECT {} FROM products WHERE {} ORDER BY {} LIMIT $4 OFFSET $5",
            PRODUCT_COLUMNS,
            condition,
            query.order_by(SORTABLE, "name")
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&search)
            .bind(category_id)
            .bind(is_active)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        Ok(PaginatedResponse::new(products, pagination, total as u64))
    }

    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn create(&self, input: ProductInput) -> AppResult<Product> {
        self.validate_input(&input).await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (
                category_id, name, brand, description, volume_ml, alcohol_percent,
                sale_price, purchase_price, image_url, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(&input.brand)
        .bind(&input.description)
        .bind(input.volume_ml)
        .bind(input.alcohol_percent)
        .bind(input.sale_price)
        .bind(input.purchase_price)
        .bind(&input.image_url)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %product.id, name = %product.name, "Created product");
        Ok(product)
    }

    pub async fn update(&self, product_id: Uuid, input: ProductInput) -> AppResult<Product> {
        self.validate_input(&input).await?;

        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET category_id = $1, name = $2, brand = $3, description = $4, volume_ml = $5,
                alcohol_percent = $6, sale_price = $7, purchase_price = $8, image_url = $9,
                is_active = COALESCE($10, is_active), updated_at = NOW()
            WHERE id = $11
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(&input.brand)
        .bind(&input.description)
        .bind(input.volume_ml)
        .bind(input.alcohol_percent)
        .bind(input.sale_price)
        .bind(input.purchase_price)
        .bind(&input.image_url)
        .bind(input.is_active)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Delete a product without stock or sales history
    pub async fn delete(&self, product_id: Uuid) -> AppResult<()> {
        let in_use = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM stocks WHERE product_id = $1 AND quantity > 0)
                OR EXISTS(SELECT 1 FROM sale_details WHERE product_id = $1)
                OR EXISTS(SELECT 1 FROM purchase_details WHERE product_id = $1)
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if in_use {
            return Err(AppError::in_use(
                "product",
                "Product has stock or sales history and cannot be deleted",
                "El producto tiene stock o historial de ventas y no se puede eliminar",
            ));
        }

        let mut tx = self.db.begin().await?;

        // Empty stock rows and movements go with the product
        sqlx::query("DELETE FROM stock_movements WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM stocks WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        let carts = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM cart_items WHERE product_id = $1 RETURNING cart_id",
        )
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?;
        refresh_carts(&mut tx, &carts).await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        tx.commit().await?;

        tracing::info!(%product_id, "Deleted product");
        Ok(())
    }

    /// Active products for the storefront, with availability
    pub async fn browse(
        &self,
        query: &ListQuery,
        category_id: Option<Uuid>,
    ) -> AppResult<PaginatedResponse<StoreProduct>> {
        let page = self.list_where(query, category_id, Some(true)).await?;

        let mut data = Vec::with_capacity(page.data.len());
        for product in page.data {
            data.push(self.with_availability(product).await?);
        }

        Ok(PaginatedResponse {
            data,
            pagination: page.pagination,
        })
    }

    /// A single active product for the storefront
    pub async fn store_product(&self, product_id: Uuid) -> AppResult<StoreProduct> {
        let product = self.get(product_id).await?;
        if !product.is_active {
            return Err(AppError::NotFound("Product".to_string()));
        }
        self.with_availability(product).await
    }

    /// Per-warehouse stock of a product
    pub async fn availability(&self, product_id: Uuid) -> AppResult<Vec<WarehouseAvailability>> {
        let stock = sqlx::query_as::<_, WarehouseAvailability>(
            r#"
            SELECT s.warehouse_id, w.name AS warehouse_name, s.quantity
            FROM stocks s
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE s.product_id = $1 AND s.quantity > 0
            ORDER BY s.quantity DESC, w.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(stock)
    }

    async fn with_availability(&self, product: Product) -> AppResult<StoreProduct> {
        let stock = self.availability(product.id).await?;
        let category_name =
            sqlx::query_scalar::<_, String>("SELECT name FROM categories WHERE id = $1")
                .bind(product.category_id)
                .fetch_one(&self.db)
                .await?;

        Ok(StoreProduct {
            available: total_available(&stock),
            product,
            category_name,
            stock,
        })
    }

    async fn validate_input(&self, input: &ProductInput) -> AppResult<()> {
        input.validate()?;
        validate_product_fields(
            input.volume_ml,
            input.alcohol_percent,
            input.sale_price,
            input.purchase_price,
        )?;

        let category_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)",
        )
        .bind(input.category_id)
        .fetch_one(&self.db)
        .await?;

        if !category_exists {
            return Err(AppError::invalid(
                "category_id",
                "Category does not exist",
                "La categoría no existe",
            ));
        }
        Ok(())
    }
}
