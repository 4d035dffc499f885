//! Activity log service: append-only audit trail of who did what to which record
//!
//! Writes are best-effort. `record` never returns an error; failures are logged
//! and dropped so auditing can never undo or block a committed operation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{ActivityFilter, EntityType, PaginatedResponse, Pagination};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Largest page returned by `recent`
pub const MAX_RECENT_LIMIT: u32 = 100;

/// Who performed an operation and from where
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Activity log service
#[derive(Clone)]
pub struct ActivityLogService {
    db: PgPool,
}

/// Activity log entry with the actor's username
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of a retention cleanup
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub days: u32,
    pub deleted: u64,
}

const SELECT_LOGS: &str = r#"
    SELECT l.id, l.user_id, u.username, l.action, l.entity_type, l.entity_id,
           l.description, l.ip_address, l.user_agent, l.created_at
    FROM activity_logs l
    LEFT JOIN users u ON u.id = l.user_id
"#;

const FILTER_LOGS: &str = r#"
    WHERE ($1::uuid IS NULL OR l.user_id = $1)
      AND ($2::text IS NULL OR l.action = $2)
      AND ($3::text IS NULL OR l.entity_type = $3)
      AND ($4::date IS NULL OR l.created_at::date >= $4)
      AND ($5::date IS NULL OR l.created_at::date <= $5)
"#;

impl ActivityLogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append an entry. Errors are logged and swallowed.
    pub async fn record(
        &self,
        actor: &Actor,
        entity_type: EntityType,
        verb: &str,
        entity_id: Option<Uuid>,
        description: &str,
    ) {
        let action = entity_type.action(verb);
        let result = sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, action, entity_type, entity_id, description, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(actor.user_id)
        .bind(&action)
        .bind(entity_type.as_str())
        .bind(entity_id)
        .bind(description)
        .bind(&actor.ip_address)
        .bind(&actor.user_agent)
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(action = %action, error = %e, "Failed to write activity log entry");
        }
    }

    /// List entries, newest first
    pub async fn list(
        &self,
        filter: &ActivityFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ActivityLog>> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM activity_logs l {}",
            FILTER_LOGS
        ))
        .bind(filter.user_id)
        .bind(&filter.action)
        .bind(&filter.entity_type)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, ActivityLog>(&format!(
            "{} {} ORDER BY l.created_at DESC LIMIT $6 OFFSET $7",
            SELECT_LOGS, FILTER_LOGS
        ))
        .bind(filter.user_id)
        .bind(&filter.action)
        .bind(&filter.entity_type)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// History of a single record
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ActivityLog>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM activity_logs WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, ActivityLog>(&format!(
            "{} WHERE l.entity_type = $1 AND l.entity_id = $2 ORDER BY l.created_at DESC LIMIT $3 OFFSET $4",
            SELECT_LOGS
        ))
        .bind(entity_type)
        .bind(entity_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// Most recent entries
    pub async fn recent(&self, limit: u32) -> AppResult<Vec<ActivityLog>> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);

        let items = sqlx::query_as::<_, ActivityLog>(&format!(
            "{} ORDER BY l.created_at DESC LIMIT $1",
            SELECT_LOGS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Delete entries older than `days` days
    pub async fn cleanup(&self, days: u32) -> AppResult<CleanupResult> {
        if days == 0 {
            return Err(AppError::validation(
                "days",
                "Retention must be at least one day",
                "Masa simpan minimal satu hari",
            ));
        }

        let result = sqlx::query(
            "DELETE FROM activity_logs WHERE created_at < NOW() - make_interval(days => $1)",
        )
        .bind(i32::try_from(days).unwrap_or(i32::MAX))
        .execute(&self.db)
        .await?;

        tracing::info!(days, deleted = result.rows_affected(), "Activity log cleanup completed");

        Ok(CleanupResult {
            days,
            deleted: result.rows_affected(),
        })
    }
}
