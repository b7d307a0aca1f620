//! Clients (customers) and their delivery addresses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer of the shop
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A delivery address of a client
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub client_id: Uuid,
    pub label: String,
    pub street: String,
    pub city: String,
    pub reference: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Single-line rendering used on sales notes and order summaries
pub fn format_address(street: &str, city: &str, reference: Option<&str>) -> String {
    match reference.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reference) => format!("{}, {} ({})", street.trim(), city.trim(), reference),
        None => format!("{}, {}", street.trim(), city.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("Av. Arce 2519", "La Paz", Some("Frente al parque")),
            "Av. Arce 2519, La Paz (Frente al parque)"
        );
        assert_eq!(format_address(" Calle 21 ", "Cochabamba", Some("  ")), "Calle 21, Cochabamba");
    }
}
