//! Client service: back-office client records, customer profile and delivery addresses

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{Address, Client, ListQuery};
use shared::{validate_document_number, validate_phone, PaginatedResponse};

const SORTABLE: &[&str] = &["name", "document_number", "created_at"];

const CLIENT_COLUMNS: &str =
    "id, user_id, name, document_number, phone, email, created_at, updated_at";

const ADDRESS_COLUMNS: &str =
    "id, client_id, label, street, city, reference, is_default, created_at";

#[derive(Clone)]
pub struct ClientService {
    db: PgPool,
}

/// Input for creating or updating a client
#[derive(Debug, Deserialize, Validate)]
pub struct ClientInput {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

impl ClientInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(document) = &self.document_number {
            validate_document_number(document)
                .map_err(|m| AppError::invalid("document_number", m, "Número de documento inválido"))?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)
                .map_err(|m| AppError::invalid("phone", m, "Número de teléfono inválido"))?;
        }
        Ok(())
    }
}

/// Input for creating or updating a delivery address
#[derive(Debug, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 50))]
    pub label: String,
    #[validate(length(min = 3, max = 255))]
    pub street: String,
    #[validate(length(min = 2, max = 100))]
    pub city: String,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl ClientService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<PaginatedResponse<Client>> {
        let pagination = query.pagination();
        let search = query.search_pattern();
        let condition = "($1::TEXT IS NULL OR name ILIKE $1 OR document_number ILIKE $1 OR email ILIKE $1)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM clients WHERE {}",
            condition
        ))
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE {} ORDER BY {} LIMIT $2 OFFSET $3",
            CLIENT_COLUMNS,
            condition,
            query.order_by(SORTABLE, "name")
        ))
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(clients, pagination, total as u64))
    }

    pub async fn get(&self, client_id: Uuid) -> AppResult<Client> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE id = $1",
            CLIENT_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))
    }

    /// Create a walk-in client without a login
    pub async fn create(&self, input: ClientInput) -> AppResult<Client> {
        input.check()?;

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (name, document_number, phone, email)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.document_number)
        .bind(&input.phone)
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(client_id = %client.id, "Created client");
        Ok(client)
    }

    pub async fn update(&self, client_id: Uuid, input: ClientInput) -> AppResult<Client> {
        input.check()?;

        sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = $1, document_number = $2, phone = $3, email = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.document_number)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))
    }

    /// Delete a client without sales
    pub async fn delete(&self, client_id: Uuid) -> AppResult<()> {
        let in_use = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM sales_notes WHERE client_id = $1)
                OR EXISTS(SELECT 1 FROM orders WHERE client_id = $1)
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.db)
        .await?;

        if in_use {
            return Err(AppError::in_use(
                "client",
                "Client has sales and cannot be deleted",
                "El cliente tiene ventas y no se puede eliminar",
            ));
        }

        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(client_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Client".to_string()));
        }

        tracing::info!(%client_id, "Deleted client");
        Ok(())
    }

    // ========================================================================
    // Addresses
    // ========================================================================

    pub async fn list_addresses(&self, client_id: Uuid) -> AppResult<Vec<Address>> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {} FROM addresses WHERE client_id = $1 ORDER BY is_default DESC, created_at",
            ADDRESS_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        Ok(addresses)
    }

    /// An address of the given client
    pub async fn get_address(&self, client_id: Uuid, address_id: Uuid) -> AppResult<Address> {
        sqlx::query_as::<_, Address>(&format!(
            "SELECT {} FROM addresses WHERE id = $1 AND client_id = $2",
            ADDRESS_COLUMNS
        ))
        .bind(address_id)
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Address".to_string()))
    }

    /// Add an address. The first address of a client becomes its default.
    pub async fn create_address(&self, client_id: Uuid, input: AddressInput) -> AppResult<Address> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let has_addresses = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM addresses WHERE client_id = $1)",
        )
        .bind(client_id)
        .fetch_one(&mut *tx)
        .await?;

        let is_default = input.is_default || !has_addresses;
        if is_default {
            Self::clear_default(&mut tx, client_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r#"
            INSERT INTO addresses (client_id, label, street, city, reference, is_default)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(client_id)
        .bind(input.label.trim())
        .bind(input.street.trim())
        .bind(input.city.trim())
        .bind(&input.reference)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    pub async fn update_address(
        &self,
        client_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> AppResult<Address> {
        input.validate()?;
        let existing = self.get_address(client_id, address_id).await?;

        let mut tx = self.db.begin().await?;

        // An address stays default until another one takes the flag
        let is_default = input.is_default || existing.is_default;
        if input.is_default {
            Self::clear_default(&mut tx, client_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r#"
            UPDATE addresses
            SET label = $1, street = $2, city = $3, reference = $4, is_default = $5
            WHERE id = $6 AND client_id = $7
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(input.label.trim())
        .bind(input.street.trim())
        .bind(input.city.trim())
        .bind(&input.reference)
        .bind(is_default)
        .bind(address_id)
        .bind(client_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete an address, promoting the oldest remaining one if it was the default
    pub async fn delete_address(&self, client_id: Uuid, address_id: Uuid) -> AppResult<()> {
        let existing = self.get_address(client_id, address_id).await?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM addresses WHERE id = $1 AND client_id = $2")
            .bind(address_id)
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        if existing.is_default {
            sqlx::query(
                r#"
                UPDATE addresses SET is_default = true
                WHERE id = (
                    SELECT id FROM addresses WHERE client_id = $1 ORDER BY created_at LIMIT 1
                )
                "#,
            )
            .bind(client_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear_default(conn: &mut sqlx::PgConnection, client_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE addresses SET is_default = false WHERE client_id = $1 AND is_default")
            .bind(client_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
