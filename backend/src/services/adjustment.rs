//! Stock adjustment service: reconcile recorded stock with a physical count

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    plan_adjustment, AdjustmentFilter, AdjustmentReason, CreateAdjustmentInput, DateRange,
    EntityType, MaterialUnit, PaginatedResponse, Pagination, StockError,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};
use crate::services::stock_ledger::{self, StockMovement};

/// Stock adjustment service
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
    activity: ActivityLogService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub material_id: Uuid,
    pub material_code: String,
    pub material_name: String,
    pub unit: MaterialUnit,
    pub old_stock: Decimal,
    pub new_stock: Decimal,
    pub difference: Decimal,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
    pub adjustment_date: NaiveDate,
    pub stock_version: i64,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReasonBreakdown {
    pub reason: AdjustmentReason,
    pub adjustments: i64,
    pub total_difference: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentStats {
    pub total_adjustments: i64,
    /// Sum of absolute differences
    pub total_absolute_difference: Decimal,
    pub net_difference: Decimal,
    pub by_reason: Vec<ReasonBreakdown>,
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    total_adjustments: i64,
    total_absolute_difference: Decimal,
    net_difference: Decimal,
}

#[derive(Debug, FromRow)]
struct AdjustmentLock {
    material_id: Uuid,
    difference: Decimal,
    stock_version: i64,
}

const SELECT_ADJUSTMENTS: &str = r#"
    SELECT a.id, a.material_id, m.code AS material_code, m.name AS material_name, m.unit,
           a.old_stock, a.new_stock, a.difference, a.reason, a.notes, a.adjustment_date,
           a.stock_version, a.created_by, u.full_name AS created_by_name, a.created_at
    FROM stock_adjustments a
    JOIN materials m ON m.id = a.material_id
    LEFT JOIN users u ON u.id = a.created_by
"#;

const FILTER_ADJUSTMENTS: &str = r#"
    WHERE ($1::uuid IS NULL OR a.material_id = $1)
      AND ($2::adjustment_reason IS NULL OR a.reason = $2)
      AND ($3::date IS NULL OR a.adjustment_date >= $3)
      AND ($4::date IS NULL OR a.adjustment_date <= $4)
      AND ($5::text IS NULL OR a.notes ILIKE '%' || $5 || '%' OR u.full_name ILIKE '%' || $5 || '%')
"#;

impl AdjustmentService {
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    /// Set a material's stock to a counted value, recording the signed difference
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateAdjustmentInput,
        today: NaiveDate,
    ) -> AppResult<StockMovement<StockAdjustment>> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let material = stock_ledger::lock_material(&mut tx, input.material_id).await?;
        stock_ledger::ensure_active(&material)?;

        let (id, change) = record_adjustment(
            &mut tx,
            material.id,
            material.current_stock,
            input.new_stock,
            input.reason,
            input.notes.as_deref(),
            today,
            actor.user_id,
        )
        .await?;

        let record = fetch_adjustment(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            material_id = %material.id,
            reason = record.reason.as_str(),
            before = %change.before,
            after = %change.after,
            "Stock adjusted"
        );

        self.activity
            .record(
                actor,
                EntityType::StockAdjustment,
                "create",
                Some(record.id),
                &format!(
                    "Adjusted {} from {} to {} ({})",
                    material.code,
                    change.before,
                    change.after,
                    record.reason.as_str()
                ),
            )
            .await;

        Ok(StockMovement {
            record,
            stock_before: change.before,
            stock_after: change.after,
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockAdjustment> {
        let mut conn = self.db.acquire().await?;
        fetch_adjustment(&mut conn, id).await
    }

    pub async fn list(
        &self,
        filter: &AdjustmentFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockAdjustment>> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_adjustments a LEFT JOIN users u ON u.id = a.created_by {}",
            FILTER_ADJUSTMENTS
        ))
        .bind(filter.material_id)
        .bind(filter.reason)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&filter.q)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, StockAdjustment>(&format!(
            "{} {} ORDER BY a.created_at DESC LIMIT $6 OFFSET $7",
            SELECT_ADJUSTMENTS, FILTER_ADJUSTMENTS
        ))
        .bind(filter.material_id)
        .bind(filter.reason)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&filter.q)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn list_by_material(
        &self,
        material_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockAdjustment>> {
        let filter = AdjustmentFilter {
            material_id: Some(material_id),
            ..Default::default()
        };
        self.list(&filter, pagination).await
    }

    pub async fn stats(&self, range: Option<DateRange>) -> AppResult<AdjustmentStats> {
        let (start, end) = (range.map(|r| r.start), range.map(|r| r.end));

        let totals = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT COUNT(*) AS total_adjustments,
                   COALESCE(SUM(ABS(difference)), 0) AS total_absolute_difference,
                   COALESCE(SUM(difference), 0) AS net_difference
            FROM stock_adjustments
            WHERE ($1::date IS NULL OR adjustment_date >= $1)
              AND ($2::date IS NULL OR adjustment_date <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        let by_reason = sqlx::query_as::<_, ReasonBreakdown>(
            r#"
            SELECT reason, COUNT(*) AS adjustments, SUM(difference) AS total_difference
            FROM stock_adjustments
            WHERE ($1::date IS NULL OR adjustment_date >= $1)
              AND ($2::date IS NULL OR adjustment_date <= $2)
            GROUP BY reason
            ORDER BY adjustments DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(AdjustmentStats {
            total_adjustments: totals.total_adjustments,
            total_absolute_difference: totals.total_absolute_difference,
            net_difference: totals.net_difference,
            by_reason,
        })
    }

    /// Delete an adjustment by applying the opposite of its recorded difference
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<StockMovement<Uuid>> {
        let mut tx = self.db.begin().await?;

        let adjustment = sqlx::query_as::<_, AdjustmentLock>(
            "SELECT material_id, difference, stock_version FROM stock_adjustments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock adjustment".to_string()))?;

        let material = stock_ledger::lock_material(&mut tx, adjustment.material_id).await?;
        stock_ledger::ensure_no_later_adjustment(&mut tx, material.id, adjustment.stock_version)
            .await?;

        let change = shared::reverse(material.current_stock, adjustment.difference).map_err(|e| match e {
            StockError::InsufficientStock { available, requested } => AppError::business_rule(
                "REVERSAL_BELOW_ZERO",
                format!(
                    "Cannot delete: current stock {} is lower than the adjusted difference {}",
                    available, requested
                ),
                format!(
                    "Tidak dapat menghapus: stok saat ini {} lebih kecil dari selisih penyesuaian {}",
                    available, requested
                ),
            ),
            other => other.into(),
        })?;

        stock_ledger::set_stock(&mut tx, material.id, change.after).await?;

        sqlx::query("DELETE FROM stock_adjustments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            material_id = %material.id,
            before = %change.before,
            after = %change.after,
            "Stock adjustment deleted and reversed"
        );

        self.activity
            .record(
                actor,
                EntityType::StockAdjustment,
                "delete",
                Some(id),
                &format!(
                    "Deleted adjustment of {} ({} reversed)",
                    material.code, adjustment.difference
                ),
            )
            .await;

        Ok(StockMovement {
            record: id,
            stock_before: change.before,
            stock_after: change.after,
        })
    }
}

/// Write an adjustment for a material the caller has locked. Shared with
/// material creation, which records opening stock this way.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn record_adjustment(
    conn: &mut PgConnection,
    material_id: Uuid,
    locked_stock: Decimal,
    new_stock: Decimal,
    reason: AdjustmentReason,
    notes: Option<&str>,
    adjustment_date: NaiveDate,
    created_by: Option<Uuid>,
) -> AppResult<(Uuid, shared::StockChange)> {
    let change = plan_adjustment(locked_stock, new_stock)?;
    let level = stock_ledger::set_stock(conn, material_id, change.after).await?;

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO stock_adjustments (
            material_id, old_stock, new_stock, difference, reason, notes,
            adjustment_date, stock_version, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(material_id)
    .bind(change.before)
    .bind(change.after)
    .bind(change.difference)
    .bind(reason)
    .bind(notes)
    .bind(adjustment_date)
    .bind(level.stock_version)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, change))
}

async fn fetch_adjustment(conn: &mut PgConnection, id: Uuid) -> AppResult<StockAdjustment> {
    sqlx::query_as::<_, StockAdjustment>(&format!("{} WHERE a.id = $1", SELECT_ADJUSTMENTS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock adjustment".to_string()))
}
