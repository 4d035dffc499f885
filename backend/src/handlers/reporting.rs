//! Reporting handlers
//!
//! Every report requires `report:view`. Tabular reports accept `format=csv`,
//! which additionally requires `report:export`.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::ApiResponse;
use uuid::Uuid;

use super::{csv_response, ok, today, RangeQuery};
use crate::error::AppResult;
use crate::extract::{AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::reporting::{DashboardSummary, TrendPoint, DEFAULT_TREND_DAYS};
use crate::services::{MaterialService, ReportingService};
use crate::AppState;

/// Trailing window used when a range report is requested without dates
const DEFAULT_REPORT_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    ctx.require("report", "view")?;

    let service = ReportingService::new(state.db);
    Ok(ok("Dashboard retrieved", service.dashboard(today()).await?))
}

/// In/out/adjustment totals; CSV exports the per-material rows
pub async fn transaction_summary_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    ctx.require("report", "view")?;

    let range = query.range_or_trailing(DEFAULT_REPORT_DAYS)?;
    let service = ReportingService::new(state.db);
    let summary = service.transaction_summary(range).await?;

    if query.wants_csv() {
        let filename = format!("transactions_{}_{}", range.start, range.end);
        return csv_response(&ctx, &filename, &summary.top_materials);
    }
    Ok(ok("Transaction summary generated", summary).into_response())
}

pub async fn low_stock_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    ctx.require("report", "view")?;

    let service = MaterialService::new(state.db);
    let items = service.low_stock().await?;

    if query.wants_csv() {
        return csv_response(&ctx, "low_stock_report", &items);
    }
    Ok(ok("Low stock report generated", items).into_response())
}

pub async fn material_trend_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(material_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<TrendQuery>,
) -> AppResult<Json<ApiResponse<Vec<TrendPoint>>>> {
    ctx.require("report", "view")?;

    let service = ReportingService::new(state.db);
    let points = service
        .material_trend(material_id, query.days.unwrap_or(DEFAULT_TREND_DAYS), today())
        .await?;
    Ok(ok("Material trend generated", points))
}

pub async fn category_distribution_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    ctx.require("report", "view")?;

    let service = ReportingService::new(state.db);
    let rows = service.category_distribution().await?;

    if query.wants_csv() {
        return csv_response(&ctx, "category_distribution", &rows);
    }
    Ok(ok("Category distribution generated", rows).into_response())
}

pub async fn stock_value_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    ctx.require("report", "view")?;

    let service = ReportingService::new(state.db);
    let rows = service.stock_value_by_category().await?;

    if query.wants_csv() {
        return csv_response(&ctx, "stock_value_by_category", &rows);
    }
    Ok(ok("Stock value report generated", rows).into_response())
}

pub async fn supplier_performance_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    ctx.require("report", "view")?;

    let range = query.range_or_trailing(DEFAULT_REPORT_DAYS)?;
    let service = ReportingService::new(state.db);
    let rows = service.supplier_performance(range).await?;

    if query.wants_csv() {
        let filename = format!("supplier_performance_{}_{}", range.start, range.end);
        return csv_response(&ctx, &filename, &rows);
    }
    Ok(ok("Supplier performance generated", rows).into_response())
}
