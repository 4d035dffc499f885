//! HTTP handlers for category endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use shared::{ApiResponse, CategoryFilter, CreateCategoryInput, PaginatedResponse, Pagination, UpdateCategoryInput};
use uuid::Uuid;

use super::{created, ok};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::category::Category;
use crate::services::CategoryService;
use crate::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<CategoryFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Category>>>> {
    ctx.require("category", "view")?;

    let service = CategoryService::new(state.db);
    let page = service.list(&filter, &pagination).await?;
    Ok(ok("Categories retrieved", page))
}

pub async fn get_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Category>>> {
    ctx.require("category", "view")?;

    let service = CategoryService::new(state.db);
    Ok(ok("Category retrieved", service.get(id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Category>>)> {
    ctx.require("category", "create")?;

    let service = CategoryService::new(state.db);
    let category = service.create(&ctx.actor(), input).await?;
    Ok(created("Category created", category))
}

pub async fn update_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateCategoryInput>,
) -> AppResult<Json<ApiResponse<Category>>> {
    ctx.require("category", "update")?;

    let service = CategoryService::new(state.db);
    let category = service.update(&ctx.actor(), id, input).await?;
    Ok(ok("Category updated", category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    ctx.require("category", "delete")?;

    let service = CategoryService::new(state.db);
    service.delete(&ctx.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
