//! HTTP handlers for stock-out (consumption) endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::{ApiResponse, CreateStockOutInput, PaginatedResponse, Pagination, StockOutFilter};
use uuid::Uuid;

use super::{created, csv_response, ok, today, RangeQuery};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::stock_ledger::StockMovement;
use crate::services::stock_out::{StockOut, StockOutStats};
use crate::services::StockOutService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StockOutReportQuery {
    #[serde(flatten)]
    pub range: RangeQuery,
    pub material_id: Option<Uuid>,
}

pub async fn create_stock_out(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<CreateStockOutInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<StockMovement<StockOut>>>)> {
    ctx.require("stock_out", "create")?;

    let service = StockOutService::new(state.db);
    let movement = service.create(&ctx.actor(), input, today()).await?;
    Ok(created("Stock out recorded", movement))
}

pub async fn list_stock_out(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<StockOutFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<StockOut>>>> {
    ctx.require("stock_out", "view")?;

    let service = StockOutService::new(state.db);
    let page = service.list(&filter, &pagination).await?;
    Ok(ok("Stock out records retrieved", page))
}

pub async fn get_stock_out(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<StockOut>>> {
    ctx.require("stock_out", "view")?;

    let service = StockOutService::new(state.db);
    Ok(ok("Stock out retrieved", service.get(id).await?))
}

pub async fn stock_out_by_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(material_id): AppPath<Uuid>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<StockOut>>>> {
    ctx.require("stock_out", "view")?;

    let service = StockOutService::new(state.db);
    let page = service.list_by_material(material_id, &pagination).await?;
    Ok(ok("Stock out records retrieved", page))
}

pub async fn stock_out_by_usage(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(usage_type): AppPath<String>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<StockOut>>>> {
    ctx.require("stock_out", "view")?;

    let service = StockOutService::new(state.db);
    let page = service.list_by_usage_type(&usage_type, &pagination).await?;
    Ok(ok("Stock out records retrieved", page))
}

pub async fn stock_out_stats(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Json<ApiResponse<StockOutStats>>> {
    ctx.require("stock_out", "view")?;

    let service = StockOutService::new(state.db);
    let stats = service.stats(query.range()?).await?;
    Ok(ok("Stock out statistics retrieved", stats))
}

/// Consumption report for a required date range; `format=csv` exports the rows
pub async fn stock_out_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<StockOutReportQuery>,
) -> AppResult<Response> {
    ctx.require("stock_out", "view")?;

    let range = query.range.required_range()?;
    let service = StockOutService::new(state.db);
    let report = service.report(range, query.material_id).await?;

    if query.range.wants_csv() {
        let filename = format!("stock_out_{}_{}", range.start, range.end);
        return csv_response(&ctx, &filename, &report.rows);
    }

    Ok(ok("Stock out report generated", report).into_response())
}

/// Delete an issue and restore its quantity
pub async fn delete_stock_out(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<StockMovement<Uuid>>>> {
    ctx.require("stock_out", "delete")?;

    let service = StockOutService::new(state.db);
    let movement = service.delete(&ctx.actor(), id).await?;
    Ok(ok("Stock out deleted", movement))
}
