//! Roles and permissions

use serde::{Deserialize, Serialize};

/// Resources guarded by permissions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Category,
    Product,
    Warehouse,
    Stock,
    Provider,
    Purchase,
    Client,
    Sale,
    Report,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Category,
        Resource::Product,
        Resource::Warehouse,
        Resource::Stock,
        Resource::Provider,
        Resource::Purchase,
        Resource::Client,
        Resource::Sale,
        Resource::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Category => "category",
            Resource::Product => "product",
            Resource::Warehouse => "warehouse",
            Resource::Stock => "stock",
            Resource::Provider => "provider",
            Resource::Purchase => "purchase",
            Resource::Client => "client",
            Resource::Sale => "sale",
            Resource::Report => "report",
        }
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

/// Permission key in `resource:action` form, as carried in access tokens
pub fn permission_key(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource.as_str(), action.as_str())
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SELLER: &str = "seller";
pub const ROLE_CUSTOMER: &str = "customer";

/// Permission keys granted to each seeded role
pub fn default_role_permissions(role: &str) -> Vec<String> {
    match role {
        ROLE_ADMIN => Resource::ALL
            .iter()
            .flat_map(|r| Action::ALL.iter().map(move |a| permission_key(*r, *a)))
            .collect(),
        ROLE_SELLER => {
            let mut keys: Vec<String> = Resource::ALL
                .iter()
                .map(|r| permission_key(*r, Action::View))
                .collect();
            for resource in [Resource::Sale, Resource::Client, Resource::Stock] {
                keys.push(permission_key(resource, Action::Create));
                keys.push(permission_key(resource, Action::Edit));
            }
            keys
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_role_permissions() {
        assert_eq!(default_role_permissions(ROLE_ADMIN).len(), 36);
        let seller = default_role_permissions(ROLE_SELLER);
        assert!(seller.contains(&"sale:create".to_string()));
        assert!(seller.contains(&"report:view".to_string()));
        assert!(!seller.contains(&"product:delete".to_string()));
        assert!(default_role_permissions(ROLE_CUSTOMER).is_empty());
    }
}
