//! HTTP handlers for supplier endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use shared::{ApiResponse, CreateSupplierInput, PaginatedResponse, Pagination, SupplierFilter, UpdateSupplierInput};
use uuid::Uuid;

use super::{created, ok};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::supplier::Supplier;
use crate::services::SupplierService;
use crate::AppState;

pub async fn list_suppliers(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<SupplierFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Supplier>>>> {
    ctx.require("supplier", "view")?;

    let service = SupplierService::new(state.db);
    let page = service.list(&filter, &pagination).await?;
    Ok(ok("Suppliers retrieved", page))
}

pub async fn list_active_suppliers(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<Vec<Supplier>>>> {
    ctx.require("supplier", "view")?;

    let service = SupplierService::new(state.db);
    Ok(ok("Active suppliers retrieved", service.list_active().await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    ctx.require("supplier", "view")?;

    let service = SupplierService::new(state.db);
    Ok(ok("Supplier retrieved", service.get(id).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Supplier>>)> {
    ctx.require("supplier", "create")?;

    let service = SupplierService::new(state.db);
    let supplier = service.create(&ctx.actor(), input).await?;
    Ok(created("Supplier created", supplier))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateSupplierInput>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    ctx.require("supplier", "update")?;

    let service = SupplierService::new(state.db);
    let supplier = service.update(&ctx.actor(), id, input).await?;
    Ok(ok("Supplier updated", supplier))
}

pub async fn deactivate_supplier(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    ctx.require("supplier", "delete")?;

    let service = SupplierService::new(state.db);
    Ok(ok("Supplier deactivated", service.deactivate(&ctx.actor(), id).await?))
}

pub async fn activate_supplier(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    ctx.require("supplier", "delete")?;

    let service = SupplierService::new(state.db);
    Ok(ok("Supplier activated", service.activate(&ctx.actor(), id).await?))
}
