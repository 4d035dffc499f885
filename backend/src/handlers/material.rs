//! HTTP handlers for material endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{
    ApiResponse, CreateMaterialInput, MaterialFilter, PaginatedResponse, Pagination,
    UpdateMaterialInput,
};
use uuid::Uuid;

use super::{created, csv_response, ok, today, RangeQuery};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::material::{MaterialStats, MaterialView, StockMovementEntry};
use crate::services::MaterialService;
use crate::AppState;

pub async fn list_materials(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<MaterialFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<MaterialView>>>> {
    ctx.require("material", "view")?;

    let service = MaterialService::new(state.db);
    let page = service.list(&filter, &pagination).await?;
    Ok(ok("Materials retrieved", page))
}

pub async fn get_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<MaterialView>>> {
    ctx.require("material", "view")?;

    let service = MaterialService::new(state.db);
    Ok(ok("Material retrieved", service.get(id).await?))
}

pub async fn create_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<CreateMaterialInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<MaterialView>>)> {
    ctx.require("material", "create")?;

    let service = MaterialService::new(state.db);
    let material = service.create(&ctx.actor(), input, today()).await?;
    Ok(created("Material created", material))
}

pub async fn update_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateMaterialInput>,
) -> AppResult<Json<ApiResponse<MaterialView>>> {
    ctx.require("material", "update")?;

    let service = MaterialService::new(state.db);
    let material = service.update(&ctx.actor(), id, input).await?;
    Ok(ok("Material updated", material))
}

pub async fn deactivate_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<MaterialView>>> {
    ctx.require("material", "delete")?;

    let service = MaterialService::new(state.db);
    Ok(ok("Material deactivated", service.deactivate(&ctx.actor(), id).await?))
}

pub async fn activate_material(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<MaterialView>>> {
    ctx.require("material", "delete")?;

    let service = MaterialService::new(state.db);
    Ok(ok("Material activated", service.activate(&ctx.actor(), id).await?))
}

/// Low-stock list; `format=csv` exports it
pub async fn low_stock_materials(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    ctx.require("material", "view")?;

    let service = MaterialService::new(state.db);
    let items = service.low_stock().await?;

    if query.wants_csv() {
        return csv_response(&ctx, "low_stock", &items);
    }
    Ok(ok("Low stock materials retrieved", items).into_response())
}

pub async fn out_of_stock_materials(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<Vec<MaterialView>>>> {
    ctx.require("material", "view")?;

    let service = MaterialService::new(state.db);
    Ok(ok("Out of stock materials retrieved", service.out_of_stock().await?))
}

pub async fn material_stats(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<MaterialStats>>> {
    ctx.require("material", "view")?;

    let service = MaterialService::new(state.db);
    Ok(ok("Material statistics retrieved", service.stats().await?))
}

/// Stock history of one material, newest mutation first
pub async fn material_movements(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<StockMovementEntry>>>> {
    ctx.require("material", "view")?;

    let service = MaterialService::new(state.db);
    let page = service.movements(id, &pagination).await?;
    Ok(ok("Stock movements retrieved", page))
}
