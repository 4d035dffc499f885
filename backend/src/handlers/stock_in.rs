//! HTTP handlers for stock-in (goods receipt) endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use shared::{
    ApiResponse, CreateStockInInput, PaginatedResponse, Pagination, StockInFilter,
    UpdateStockInInput,
};
use uuid::Uuid;

use super::{created, ok, today, RangeQuery};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::stock_in::{MonthlyReceipts, StockIn, StockInStats};
use crate::services::stock_ledger::StockMovement;
use crate::services::StockInService;
use crate::AppState;

/// Record a goods receipt
pub async fn create_stock_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<CreateStockInInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<StockMovement<StockIn>>>)> {
    ctx.require("stock_in", "create")?;

    let service = StockInService::new(state.db);
    let movement = service.create(&ctx.actor(), input, today()).await?;
    Ok(created("Stock in recorded", movement))
}

pub async fn list_stock_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<StockInFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<StockIn>>>> {
    ctx.require("stock_in", "view")?;

    let service = StockInService::new(state.db);
    let page = service.list(&filter, &pagination).await?;
    Ok(ok("Stock in records retrieved", page))
}

pub async fn get_stock_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<StockIn>>> {
    ctx.require("stock_in", "view")?;

    let service = StockInService::new(state.db);
    Ok(ok("Stock in retrieved", service.get(id).await?))
}

/// Edit supplier, date, invoice or notes; quantity and price are fixed
pub async fn update_stock_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateStockInInput>,
) -> AppResult<Json<ApiResponse<StockIn>>> {
    ctx.require("stock_in", "update")?;

    let service = StockInService::new(state.db);
    let record = service.update(&ctx.actor(), id, input, today()).await?;
    Ok(ok("Stock in updated", record))
}

/// Delete a receipt and reverse its quantity
pub async fn delete_stock_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<StockMovement<Uuid>>>> {
    ctx.require("stock_in", "delete")?;

    let service = StockInService::new(state.db);
    let movement = service.delete(&ctx.actor(), id).await?;
    Ok(ok("Stock in deleted", movement))
}

pub async fn stock_in_today(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<Vec<StockIn>>>> {
    ctx.require("stock_in", "view")?;

    let service = StockInService::new(state.db);
    Ok(ok("Today's stock in retrieved", service.list_for_day(today()).await?))
}

pub async fn stock_in_stats(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Json<ApiResponse<StockInStats>>> {
    ctx.require("stock_in", "view")?;

    let service = StockInService::new(state.db);
    let stats = service.stats(query.range()?).await?;
    Ok(ok("Stock in statistics retrieved", stats))
}

pub async fn stock_in_monthly(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(year): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Vec<MonthlyReceipts>>>> {
    ctx.require("stock_in", "view")?;

    let service = StockInService::new(state.db);
    let months = service.monthly_summary(year).await?;
    Ok(ok("Monthly stock in summary retrieved", months))
}
