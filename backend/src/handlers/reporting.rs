//! Reporting handlers for analytics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{
    DashboardMetrics, GroupBy, ReportFilter, ReportingService,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct SalesReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub group_by: GroupBy,
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
pub struct TopProductsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct StockReportQuery {
    pub format: Option<String>,
}

fn reporting_service(state: &AppState) -> ReportingService {
    ReportingService::new(state.db.clone(), state.config.store.low_stock_threshold)
}

/// JSON by default, CSV attachment when asked for
fn render<T: Serialize>(data: Vec<T>, format: Option<&str>, filename: &str) -> AppResult<Response> {
    if format == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        let disposition = format!("attachment; filename=\"{}.csv\"", filename);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    user.require("report", "view")?;

    let metrics = reporting_service(&state).dashboard().await?;
    Ok(Json(metrics))
}

/// Get sales report grouped by day or month
pub async fn get_sales_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SalesReportQuery>,
) -> AppResult<Response> {
    user.require("report", "view")?;

    let filter = ReportFilter {
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let data = reporting_service(&state)
        .sales_report(&filter, query.group_by)
        .await?;

    render(data, query.format.as_deref(), "sales")
}

/// Get best selling products
pub async fn get_top_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TopProductsQuery>,
) -> AppResult<Response> {
    user.require("report", "view")?;

    let filter = ReportFilter {
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let data = reporting_service(&state)
        .top_products(&filter, query.limit.unwrap_or(10))
        .await?;

    render(data, query.format.as_deref(), "top_products")
}

/// Get stock valuation report
pub async fn get_stock_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StockReportQuery>,
) -> AppResult<Response> {
    user.require("report", "view")?;

    let data = reporting_service(&state).stock_valuation().await?;

    render(data, query.format.as_deref(), "stock_valuation")
}
