//! HTTP handlers for stock adjustment endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use shared::{AdjustmentFilter, ApiResponse, CreateAdjustmentInput, PaginatedResponse, Pagination};
use uuid::Uuid;

use super::{created, ok, today, RangeQuery};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::adjustment::{AdjustmentStats, StockAdjustment};
use crate::services::stock_ledger::StockMovement;
use crate::services::AdjustmentService;
use crate::AppState;

/// Reconcile a material to a counted value (manager or admin)
pub async fn create_adjustment(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<CreateAdjustmentInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<StockMovement<StockAdjustment>>>)> {
    ctx.require("stock_adjustment", "create")?;

    let service = AdjustmentService::new(state.db);
    let movement = service.create(&ctx.actor(), input, today()).await?;
    Ok(created("Stock adjusted", movement))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<AdjustmentFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<StockAdjustment>>>> {
    ctx.require("stock_adjustment", "view")?;

    let service = AdjustmentService::new(state.db);
    let page = service.list(&filter, &pagination).await?;
    Ok(ok("Stock adjustments retrieved", page))
}

pub async fn get_adjustment(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<StockAdjustment>>> {
    ctx.require("stock_adjustment", "view")?;

    let service = AdjustmentService::new(state.db);
    Ok(ok("Stock adjustment retrieved", service.get(id).await?))
}

pub async fn adjustments_by_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(material_id): AppPath<Uuid>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<StockAdjustment>>>> {
    ctx.require("stock_adjustment", "view")?;

    let service = AdjustmentService::new(state.db);
    let page = service.list_by_material(material_id, &pagination).await?;
    Ok(ok("Stock adjustments retrieved", page))
}

pub async fn adjustment_stats(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Json<ApiResponse<AdjustmentStats>>> {
    ctx.require("stock_adjustment", "view")?;

    let service = AdjustmentService::new(state.db);
    let stats = service.stats(query.range()?).await?;
    Ok(ok("Stock adjustment statistics retrieved", stats))
}

pub async fn delete_adjustment(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<StockMovement<Uuid>>>> {
    ctx.require("stock_adjustment", "delete")?;

    let service = AdjustmentService::new(state.db);
    let movement = service.delete(&ctx.actor(), id).await?;
    Ok(ok("Stock adjustment deleted", movement))
}
