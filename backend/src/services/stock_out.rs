//! Stock-out service: consumption that decreases a material's stock

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    validate_transaction_date, CreateStockOutInput, DateRange, EntityType, MaterialUnit,
    PaginatedResponse, Pagination, ReferencePrefix, StockOutFilter,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};
use crate::services::stock_ledger::{self, StockMovement};

/// Stock-out service
#[derive(Clone)]
pub struct StockOutService {
    db: PgPool,
    activity: ActivityLogService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockOut {
    pub id: Uuid,
    pub reference_number: String,
    pub material_id: Uuid,
    pub material_code: String,
    pub material_name: String,
    pub unit: MaterialUnit,
    pub quantity: Decimal,
    pub usage_type: String,
    pub destination: Option<String>,
    pub transaction_date: NaiveDate,
    pub notes: Option<String>,
    pub stock_version: i64,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Consumption grouped by usage type
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UsageBreakdown {
    pub usage_type: String,
    pub transactions: i64,
    pub total_quantity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockOutStats {
    pub total_transactions: i64,
    pub total_quantity: Decimal,
    pub distinct_materials: i64,
    pub by_usage_type: Vec<UsageBreakdown>,
}

#[derive(Debug, FromRow)]
struct StatsRow {
    total_transactions: i64,
    total_quantity: Decimal,
    distinct_materials: i64,
}

/// Rows and totals for a consumption report
#[derive(Debug, Clone, Serialize)]
pub struct StockOutReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: Vec<StockOut>,
    pub total_transactions: usize,
    pub total_quantity: Decimal,
    pub by_usage_type: Vec<UsageBreakdown>,
}

#[derive(Debug, FromRow)]
struct IssueLock {
    material_id: Uuid,
    reference_number: String,
    quantity: Decimal,
    stock_version: i64,
}

const SELECT_STOCK_OUT: &str = r#"
    SELECT o.id, o.reference_number, o.material_id, m.code AS material_code, m.name AS material_name,
           m.unit, o.quantity, o.usage_type, o.destination, o.transaction_date, o.notes,
           o.stock_version, o.created_by, u.full_name AS created_by_name, o.created_at
    FROM stock_out o
    JOIN materials m ON m.id = o.material_id
    LEFT JOIN users u ON u.id = o.created_by
"#;

const FILTER_STOCK_OUT: &str = r#"
    WHERE ($1::uuid IS NULL OR o.material_id = $1)
      AND ($2::text IS NULL OR o.usage_type = $2)
      AND ($3::date IS NULL OR o.transaction_date >= $3)
      AND ($4::date IS NULL OR o.transaction_date <= $4)
      AND ($5::text IS NULL
           OR o.reference_number ILIKE '%' || $5 || '%'
           OR o.destination ILIKE '%' || $5 || '%'
           OR o.notes ILIKE '%' || $5 || '%')
"#;

impl StockOutService {
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    /// Record consumption. The conditional decrement and the insert share one
    /// transaction; an insufficient balance leaves nothing behind.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateStockOutInput,
        today: NaiveDate,
    ) -> AppResult<StockMovement<StockOut>> {
        input.validate()?;

        let transaction_date = input.transaction_date.unwrap_or(today);
        if let Err(msg) = validate_transaction_date(transaction_date, today) {
            return Err(AppError::validation(
                "transaction_date",
                msg,
                "Tanggal transaksi tidak boleh di masa depan",
            ));
        }

        let mut tx = self.db.begin().await?;

        let reference_number = match input.reference_number {
            Some(reference) => {
                if stock_ledger::reference_exists(&mut tx, ReferencePrefix::StockOut, &reference).await? {
                    return Err(AppError::DuplicateEntry("reference_number".to_string()));
                }
                reference
            }
            None => {
                stock_ledger::next_reference_number(&mut tx, ReferencePrefix::StockOut, transaction_date)
                    .await?
            }
        };

        let level = stock_ledger::issue(&mut tx, input.material_id, input.quantity).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_out (
                reference_number, material_id, quantity, usage_type, destination,
                transaction_date, notes, stock_version, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&reference_number)
        .bind(input.material_id)
        .bind(input.quantity)
        .bind(input.usage_type.trim())
        .bind(&input.destination)
        .bind(transaction_date)
        .bind(&input.notes)
        .bind(level.stock_version)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let record = fetch_stock_out(&mut tx, id).await?;
        tx.commit().await?;

        let before = level.current_stock + input.quantity;
        tracing::info!(
            material_id = %record.material_id,
            reference = %record.reference_number,
            before = %before,
            after = %level.current_stock,
            "Stock out recorded"
        );

        self.activity
            .record(
                actor,
                EntityType::StockOut,
                "create",
                Some(record.id),
                &format!(
                    "Recorded stock out {} of {} {} from {} ({})",
                    record.reference_number,
                    record.quantity,
                    record.unit.as_str(),
                    record.material_code,
                    record.usage_type
                ),
            )
            .await;

        Ok(StockMovement {
            record,
            stock_before: before,
            stock_after: level.current_stock,
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockOut> {
        let mut conn = self.db.acquire().await?;
        fetch_stock_out(&mut conn, id).await
    }

    pub async fn list(
        &self,
        filter: &StockOutFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockOut>> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_out o {}",
            FILTER_STOCK_OUT
        ))
        .bind(filter.material_id)
        .bind(&filter.usage_type)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&filter.q)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, StockOut>(&format!(
            "{} {} ORDER BY o.transaction_date DESC, o.created_at DESC LIMIT $6 OFFSET $7",
            SELECT_STOCK_OUT, FILTER_STOCK_OUT
        ))
        .bind(filter.material_id)
        .bind(&filter.usage_type)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&filter.q)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// Consumption history of one material
    pub async fn list_by_material(
        &self,
        material_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockOut>> {
        let filter = StockOutFilter {
            material_id: Some(material_id),
            ..Default::default()
        };
        self.list(&filter, pagination).await
    }

    pub async fn list_by_usage_type(
        &self,
        usage_type: &str,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockOut>> {
        let filter = StockOutFilter {
            usage_type: Some(usage_type.to_string()),
            ..Default::default()
        };
        self.list(&filter, pagination).await
    }

    pub async fn stats(&self, range: Option<DateRange>) -> AppResult<StockOutStats> {
        let (start, end) = (range.map(|r| r.start), range.map(|r| r.end));

        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT COUNT(*) AS total_transactions,
                   COALESCE(SUM(quantity), 0) AS total_quantity,
                   COUNT(DISTINCT material_id) AS distinct_materials
            FROM stock_out
            WHERE ($1::date IS NULL OR transaction_date >= $1)
              AND ($2::date IS NULL OR transaction_date <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        let by_usage_type = self.usage_breakdown(start, end, None).await?;

        Ok(StockOutStats {
            total_transactions: row.total_transactions,
            total_quantity: row.total_quantity,
            distinct_materials: row.distinct_materials,
            by_usage_type,
        })
    }

    /// Consumption report over an inclusive date range
    pub async fn report(&self, range: DateRange, material_id: Option<Uuid>) -> AppResult<StockOutReport> {
        let rows = sqlx::query_as::<_, StockOut>(&format!(
            r#"{}
            WHERE o.transaction_date BETWEEN $1 AND $2
              AND ($3::uuid IS NULL OR o.material_id = $3)
            ORDER BY o.transaction_date, o.created_at"#,
            SELECT_STOCK_OUT
        ))
        .bind(range.start)
        .bind(range.end)
        .bind(material_id)
        .fetch_all(&self.db)
        .await?;

        let by_usage_type = self
            .usage_breakdown(Some(range.start), Some(range.end), material_id)
            .await?;
        let total_quantity = rows.iter().map(|r| r.quantity).sum();

        Ok(StockOutReport {
            start: range.start,
            end: range.end,
            total_transactions: rows.len(),
            total_quantity,
            rows,
            by_usage_type,
        })
    }

    async fn usage_breakdown(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        material_id: Option<Uuid>,
    ) -> AppResult<Vec<UsageBreakdown>> {
        let rows = sqlx::query_as::<_, UsageBreakdown>(
            r#"
            SELECT usage_type, COUNT(*) AS transactions, SUM(quantity) AS total_quantity
            FROM stock_out
            WHERE ($1::date IS NULL OR transaction_date >= $1)
              AND ($2::date IS NULL OR transaction_date <= $2)
              AND ($3::uuid IS NULL OR material_id = $3)
            GROUP BY usage_type
            ORDER BY total_quantity DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(material_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Delete a stock-out and put its quantity back
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<StockMovement<Uuid>> {
        let mut tx = self.db.begin().await?;

        let issue = sqlx::query_as::<_, IssueLock>(
            "SELECT material_id, reference_number, quantity, stock_version FROM stock_out WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock out".to_string()))?;

        let material = stock_ledger::lock_material(&mut tx, issue.material_id).await?;
        stock_ledger::ensure_no_later_adjustment(&mut tx, material.id, issue.stock_version).await?;

        // The issue removed stock, so its recorded effect is negative
        let change = shared::reverse(material.current_stock, -issue.quantity)?;
        stock_ledger::set_stock(&mut tx, material.id, change.after).await?;

        sqlx::query("DELETE FROM stock_out WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            material_id = %material.id,
            reference = %issue.reference_number,
            before = %change.before,
            after = %change.after,
            "Stock out deleted and restored"
        );

        self.activity
            .record(
                actor,
                EntityType::StockOut,
                "delete",
                Some(id),
                &format!(
                    "Deleted stock out {} and restored {} of {}",
                    issue.reference_number, issue.quantity, material.code
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

async fn fetch_stock_out(conn: &mut PgConnection, id: Uuid) -> AppResult<StockOut> {
    sqlx::query_as::<_, StockOut>(&format!("{} WHERE o.id = $1", SELECT_STOCK_OUT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock out".to_string()))
}
