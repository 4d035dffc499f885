//! Role and permission handlers

use axum::{
    extract::State,
    Json,
};
use shared::{ApiResponse, UpdateRolePermissionsInput};
use uuid::Uuid;

use super::ok;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequestContext;
use crate::services::role::{Permission, Role, RoleWithPermissions};
use crate::services::RoleService;
use crate::AppState;

pub async fn list_roles(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<Vec<Role>>>> {
    ctx.require("role", "view")?;

    let service = RoleService::new(state.db);
    Ok(ok("Roles retrieved", service.list().await?))
}

pub async fn get_role(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<RoleWithPermissions>>> {
    ctx.require("role", "view")?;

    let service = RoleService::new(state.db);
    Ok(ok("Role retrieved", service.get(id).await?))
}

pub async fn list_permissions(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<Vec<Permission>>>> {
    ctx.require("role", "view")?;

    let service = RoleService::new(state.db);
    Ok(ok("Permissions retrieved", service.list_permissions().await?))
}

/// Replace the permission set of a role. Takes effect at the holders' next login.
pub async fn update_role_permissions(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateRolePermissionsInput>,
) -> AppResult<Json<ApiResponse<RoleWithPermissions>>> {
    ctx.require("role", "update")?;

    let service = RoleService::new(state.db);
    let role = service.update_permissions(&ctx.actor(), id, input).await?;
    Ok(ok("Role permissions updated", role))
}
