//! HTTP handlers for user management

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use shared::{ApiResponse, CreateUserInput, PaginatedResponse, Pagination, UpdateUserInput, UserFilter};
use uuid::Uuid;

use super::{created, ok};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::user::User;
use crate::services::UserService;
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<UserFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<User>>>> {
    ctx.require("user", "view")?;

    let service = UserService::new(state.db);
    Ok(ok("Users retrieved", service.list(&filter, &pagination).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    ctx.require("user", "view")?;

    let service = UserService::new(state.db);
    Ok(ok("User retrieved", service.get(id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<CreateUserInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    ctx.require("user", "create")?;

    let service = UserService::new(state.db);
    let user = service.create(&ctx.actor(), input).await?;
    Ok(created("User created", user))
}

pub async fn update_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateUserInput>,
) -> AppResult<Json<ApiResponse<User>>> {
    ctx.require("user", "update")?;

    let service = UserService::new(state.db);
    let user = service.update(&ctx.actor(), id, input).await?;
    Ok(ok("User updated", user))
}

/// Deactivate a user and revoke their refresh tokens
pub async fn deactivate_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    ctx.require("user", "delete")?;

    let service = UserService::new(state.db);
    Ok(ok("User deactivated", service.deactivate(&ctx.actor(), id).await?))
}

pub async fn activate_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    ctx.require("user", "delete")?;

    let service = UserService::new(state.db);
    Ok(ok("User activated", service.activate(&ctx.actor(), id).await?))
}
