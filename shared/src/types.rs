//! Common types used across the platform

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 15;
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Build pagination from optional query values, clamping to sane bounds
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn meta(&self, total_items: u64) -> PaginationMeta {
        let per_page = u64::from(self.per_page);
        let total_pages = total_items.div_ceil(per_page) as u32;
        PaginationMeta {
            page: self.page,
            per_page: self.per_page,
            total_items,
            total_pages,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total_items: u64) -> Self {
        Self {
            data,
            pagination: pagination.meta(total_items),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Resolve a requested sort column against a whitelist.
///
/// Column names end up interpolated into SQL, so anything outside `allowed`
/// falls back to `default`.
pub fn resolve_sort_column<'a>(
    requested: Option<&str>,
    allowed: &[&'a str],
    default: &'a str,
) -> &'a str {
    requested
        .and_then(|r| allowed.iter().find(|c| **c == r).copied())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::from_query(Some(0), Some(1000));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PER_PAGE);

        let p = Pagination::from_query(None, None);
        assert_eq!(p, Pagination::default());
    }

    #[test]
    fn test_pagination_offset_and_meta() {
        let p = Pagination::from_query(Some(3), Some(10));
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);

        let meta = p.meta(41);
        assert_eq!(meta.total_pages, 5);
        assert_eq!(p.meta(0).total_pages, 0);
    }

    #[test]
    fn test_sort_column_whitelist() {
        let allowed = ["name", "sale_price", "created_at"];
        assert_eq!(resolve_sort_column(Some("sale_price"), &allowed, "name"), "sale_price");
        assert_eq!(
            resolve_sort_column(Some("name; DROP TABLE products"), &allowed, "name"),
            "name"
        );
        assert_eq!(resolve_sort_column(None, &allowed, "created_at"), "created_at");
    }
}
