//! Reporting service for the back office dashboard and data export

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
    low_stock_threshold: i32,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_products: i64,
    pub total_clients: i64,
    pub sales_today: i64,
    pub sales_today_amount: Decimal,
    pub sales_this_month: i64,
    pub sales_this_month_amount: Decimal,
    pub pending_sales_notes: i64,
    pub low_stock_items: i64,
}

/// Sales grouped by day or month
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SalesReportRow {
    pub period: String,
    pub completed_count: i64,
    pub completed_amount: Decimal,
    pub cancelled_count: i64,
}

/// Best selling products
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

/// Stock valuation per product and warehouse
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockValuationRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub warehouse_name: String,
    pub quantity: i32,
    pub purchase_price: Decimal,
    pub value: Decimal,
}

/// Grouping of the sales report
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Day,
    Month,
}

impl GroupBy {
    fn trunc(&self) -> &'static str {
        match self {
            GroupBy::Day => "day",
            GroupBy::Month => "month",
        }
    }

    fn label_format(&self) -> &'static str {
        match self {
            GroupBy::Day => "YYYY-MM-DD",
            GroupBy::Month => "YYYY-MM",
        }
    }
}

/// Report date range; open ends cover all history
#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportFilter {
    fn bounds(&self) -> AppResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::invalid(
                    "start_date",
                    "Start date must not be after end date",
                    "La fecha inicial no puede ser posterior a la final",
                ));
            }
        }
        Ok((self.start_date, self.end_date))
    }
}

impl ReportingService {
    pub fn new(db: PgPool, low_stock_threshold: i32) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    /// Get dashboard metrics
    pub async fn dashboard(&self) -> AppResult<DashboardMetrics> {
        let today = Utc::now().date_naive();
        let month_start = today.with_day(1).unwrap_or(today);

        let total_products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active")
                .fetch_one(&self.db)
                .await?;

        let total_clients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.db)
            .await?;

        let (sales_today, sales_today_amount) = self.completed_since(today).await?;
        let (sales_this_month, sales_this_month_amount) = self.completed_since(month_start).await?;

        let pending_sales_notes: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales_notes WHERE status = 'pending'")
                .fetch_one(&self.db)
                .await?;

        let low_stock_items: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stocks WHERE quantity <= $1")
                .bind(self.low_stock_threshold)
                .fetch_one(&self.db)
                .await?;

        Ok(DashboardMetrics {
            total_products,
            total_clients,
            sales_today,
            sales_today_amount,
            sales_this_month,
            sales_this_month_amount,
            pending_sales_notes,
            low_stock_items,
        })
    }

    async fn completed_since(&self, since: NaiveDate) -> AppResult<(i64, Decimal)> {
        let row: (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total), 0)
            FROM sales_notes
            WHERE status = 'completed' AND created_at::DATE >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    /// Sales per day or month within the range
    pub async fn sales_report(
        &self,
        filter: &ReportFilter,
        group_by: GroupBy,
    ) -> AppResult<Vec<SalesReportRow>> {
        let (start, end) = filter.bounds()?;

        let query = format!(
            r#"
            SELECT
                TO_CHAR(DATE_TRUNC('{trunc}', created_at), '{label}') AS period,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed_count,
                COALESCE(SUM(total) FILTER (WHERE status = 'completed'), 0) AS completed_amount,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_count
            FROM sales_notes
            WHERE ($1::DATE IS NULL OR created_at::DATE >= $1)
              AND ($2::DATE IS NULL OR created_at::DATE <= $2)
            GROUP BY DATE_TRUNC('{trunc}', created_at)
            ORDER BY DATE_TRUNC('{trunc}', created_at) ASC
            "#,
            trunc = group_by.trunc(),
            label = group_by.label_format(),
        );

        let rows = sqlx::query_as::<_, SalesReportRow>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Products ranked by units sold on completed sales
    pub async fn top_products(&self, filter: &ReportFilter, limit: i64) -> AppResult<Vec<TopProductRow>> {
        let (start, end) = filter.bounds()?;

        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                SUM(sd.quantity)::BIGINT AS units_sold,
                SUM(sd.total) AS revenue
            FROM sale_details sd
            JOIN sales_notes sn ON sn.id = sd.sales_note_id
            JOIN products p ON p.id = sd.product_id
            WHERE sn.status = 'completed'
              AND ($1::DATE IS NULL OR sn.created_at::DATE >= $1)
              AND ($2::DATE IS NULL OR sn.created_at::DATE <= $2)
            GROUP BY p.id, p.name
            ORDER BY units_sold DESC, revenue DESC
            LIMIT $3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Value of the stock on hand at purchase price
    pub async fn stock_valuation(&self) -> AppResult<Vec<StockValuationRow>> {
        let rows = sqlx::query_as::<_, StockValuationRow>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                w.name AS warehouse_name,
                s.quantity,
                p.purchase_price,
                s.quantity * p.purchase_price AS value
            FROM stocks s
            JOIN products p ON p.id = s.product_id
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE s.quantity > 0
            ORDER BY p.name, w.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_to_csv() {
        let rows = vec![
            SalesReportRow {
                period: "2024-06".to_string(),
                completed_count: 3,
                completed_amount: Decimal::new(45050, 2),
                cancelled_count: 1,
            },
            SalesReportRow {
                period: "2024-07".to_string(),
                completed_count: 0,
                completed_amount: Decimal::ZERO,
                cancelled_count: 0,
            },
        ];

        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("period,completed_count,completed_amount,cancelled_count")
        );
        assert_eq!(lines.next(), Some("2024-06,3,450.50,1"));
        assert_eq!(lines.next(), Some("2024-07,0,0,0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_empty() {
        let rows: Vec<TopProductRow> = Vec::new();
        assert_eq!(ReportingService::export_to_csv(&rows).unwrap(), "");
    }

    #[test]
    fn test_filter_bounds() {
        let filter = ReportFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 7, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        };
        assert!(filter.bounds().is_err());

        let (start, end) = ReportFilter::default().bounds().unwrap();
        assert!(start.is_none() && end.is_none());
    }
}
