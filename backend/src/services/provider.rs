//! Provider (supplier) management service

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ListQuery, Provider};
use shared::{validate_phone, PaginatedResponse};

const SORTABLE: &[&str] = &["name", "created_at"];

const PROVIDER_COLUMNS: &str =
    "id, name, contact_name, phone, email, address, created_at, updated_at";

#[derive(Clone)]
pub struct ProviderService {
    db: PgPool,
}

/// Input for creating or updating a provider
#[derive(Debug, Deserialize, Validate)]
pub struct ProviderInput {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(max = 120))]
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

impl ProviderInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(phone) = &self.phone {
            validate_phone(phone)
                .map_err(|m| AppError::invalid("phone", m, "Número de teléfono inválido"))?;
        }
        Ok(())
    }
}

impl ProviderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<PaginatedResponse<Provider>> {
        let pagination = query.pagination();
        let search = query.search_pattern();
        let condition =
            "($1::TEXT IS NULL OR name ILIKE $1 OR contact_name ILIKE $1 OR email ILIKE $1)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM providers WHERE {}",
            condition
        ))
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let providers = sqlx::query_as::<_, Provider>(&format!(
            "SELECT {} FROM providers WHERE {} ORDER BY {} LIMIT $2 OFFSET $3",
            PROVIDER_COLUMNS,
            condition,
            query.order_by(SORTABLE, "name")
        ))
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(providers, pagination, total as u64))
    }

    pub async fn get(&self, provider_id: Uuid) -> AppResult<Provider> {
        sqlx::query_as::<_, Provider>(&format!(
            "SELECT {} FROM providers WHERE id = $1",
            PROVIDER_COLUMNS
        ))
        .bind(provider_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider".to_string()))
    }

    pub async fn create(&self, input: ProviderInput) -> AppResult<Provider> {
        input.check()?;

        let provider = sqlx::query_as::<_, Provider>(&format!(
            r#"
            INSERT INTO providers (name, contact_name, phone, email, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROVIDER_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(provider_id = %provider.id, "Created provider");
        Ok(provider)
    }

    pub async fn update(&self, provider_id: Uuid, input: ProviderInput) -> AppResult<Provider> {
        input.check()?;

        sqlx::query_as::<_, Provider>(&format!(
            r#"
            UPDATE providers
            SET name = $1, contact_name = $2, phone = $3, email = $4, address = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            PROVIDER_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(provider_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider".to_string()))
    }

    /// Delete a provider without purchase notes
    pub async fn delete(&self, provider_id: Uuid) -> AppResult<()> {
        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchase_notes WHERE provider_id = $1)",
        )
        .bind(provider_id)
        .fetch_one(&self.db)
        .await?;

        if in_use {
            return Err(AppError::in_use(
                "provider",
                "Provider has purchase notes and cannot be deleted",
                "El proveedor tiene notas de compra y no se puede eliminar",
            ));
        }

        let result = sqlx::query("DELETE FROM providers WHERE id = $1")
            .bind(provider_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Provider".to_string()));
        }

        tracing::info!(%provider_id, "Deleted provider");
        Ok(())
    }
}
