//! Activity log handlers

use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use shared::{ActivityFilter, ApiResponse, EntityType, PaginatedResponse, Pagination};
use uuid::Uuid;

use super::ok;
use crate::error::AppResult;
use crate::extract::{AppPath, AppQuery};
use crate::middleware::RequestContext;
use crate::services::activity_log::{ActivityLog, CleanupResult};
use crate::services::ActivityLogService;
use crate::AppState;

const DEFAULT_RECENT_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<u32>,
}

pub async fn list_activity_logs(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(filter): AppQuery<ActivityFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<ActivityLog>>>> {
    ctx.require("activity_log", "view")?;

    let service = ActivityLogService::new(state.db);
    Ok(ok("Activity logs retrieved", service.list(&filter, &pagination).await?))
}

/// History of one record, e.g. `/activity-logs/entity/stock_in/{id}`
pub async fn entity_activity_logs(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppPath((entity_type, entity_id)): AppPath<(String, Uuid)>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<ActivityLog>>>> {
    ctx.require("activity_log", "view")?;

    let service = ActivityLogService::new(state.db);
    let page = service
        .list_for_entity(&entity_type, entity_id, &pagination)
        .await?;
    Ok(ok("Activity logs retrieved", page))
}

pub async fn recent_activity_logs(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<RecentQuery>,
) -> AppResult<Json<ApiResponse<Vec<ActivityLog>>>> {
    ctx.require("activity_log", "view")?;

    let service = ActivityLogService::new(state.db);
    let items = service
        .recent(query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
        .await?;
    Ok(ok("Recent activity retrieved", items))
}

/// Delete entries older than `days` (configured retention when omitted)
pub async fn cleanup_activity_logs(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppQuery(query): AppQuery<CleanupQuery>,
) -> AppResult<Json<ApiResponse<CleanupResult>>> {
    ctx.require("activity_log", "cleanup")?;

    let days = query
        .days
        .unwrap_or(state.config.activity_log.retention_days);

    let service = ActivityLogService::new(state.db);
    let result = service.cleanup(days).await?;

    service
        .record(
            &ctx.actor(),
            EntityType::ActivityLog,
            "cleanup",
            None,
            &format!("Deleted {} entries older than {} days", result.deleted, days),
        )
        .await;

    Ok(ok("Activity logs cleaned up", result))
}
