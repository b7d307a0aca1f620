//! Database models for the Drinks Shop platform
//!
//! Re-exports models from the shared crate and adds backend-specific query types

use serde::Deserialize;

pub use shared::models::*;
use shared::{Pagination, SortDirection};

/// Common query string of list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.per_page)
    }

    /// `ILIKE` pattern for the search term, if any
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
    }

    pub fn direction(&self) -> SortDirection {
        self.direction.unwrap_or_default()
    }

    /// `ORDER BY` clause from a whitelisted column
    pub fn order_by(&self, allowed: &[&str], default: &str) -> String {
        let column = shared::resolve_sort_column(self.sort.as_deref(), allowed, default);
        format!("{} {}", column, self.direction().as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern() {
        let query = ListQuery {
            search: Some("  ron 100%  ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_pattern().as_deref(), Some("%ron 100\\%%"));
        assert!(ListQuery::default().search_pattern().is_none());
    }

    #[test]
    fn test_order_by_rejects_unknown_columns() {
        let query = ListQuery {
            sort: Some("name; DROP TABLE products".to_string()),
            direction: Some(SortDirection::Desc),
            ..Default::default()
        };
        assert_eq!(query.order_by(&["name", "sale_price"], "created_at"), "created_at DESC");
    }
}
