//! Stock-in service: goods receipts that increase a material's stock

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    stock, validate_transaction_date, CreateStockInInput, DateRange, EntityType, MaterialUnit,
    PaginatedResponse, Pagination, ReferencePrefix, StockError, StockInFilter, UpdateStockInInput,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};
use crate::services::stock_ledger::{self, StockMovement};
use crate::services::supplier::ensure_active_supplier;

/// Stock-in service
#[derive(Clone)]
pub struct StockInService {
    db: PgPool,
    activity: ActivityLogService,
}

/// Receipt with material and supplier details
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockIn {
    pub id: Uuid,
    pub reference_number: String,
    pub material_id: Uuid,
    pub material_code: String,
    pub material_name: String,
    pub unit: MaterialUnit,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub transaction_date: NaiveDate,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub stock_version: i64,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ranked material or supplier by received value
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopReceiptEntry {
    pub id: Uuid,
    pub name: String,
    pub transactions: i64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

/// Aggregate figures over receipts
#[derive(Debug, Clone, Serialize)]
pub struct StockInStats {
    pub total_transactions: i64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
    pub average_value: Decimal,
    pub distinct_materials: i64,
    pub distinct_suppliers: i64,
    pub top_materials: Vec<TopReceiptEntry>,
    pub top_suppliers: Vec<TopReceiptEntry>,
}

#[derive(Debug, FromRow)]
struct StatsRow {
    total_transactions: i64,
    total_quantity: Decimal,
    total_value: Decimal,
    average_value: Option<Decimal>,
    distinct_materials: i64,
    distinct_suppliers: i64,
}

/// Receipts for one month of a year
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyReceipts {
    pub month: i32,
    pub transactions: i64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

/// Columns needed to reverse a receipt
#[derive(Debug, FromRow)]
struct ReceiptLock {
    material_id: Uuid,
    reference_number: String,
    quantity: Decimal,
    stock_version: i64,
}

const SELECT_STOCK_IN: &str = r#"
    SELECT s.id, s.reference_number, s.material_id, m.code AS material_code, m.name AS material_name,
           m.unit, s.supplier_id, sp.name AS supplier_name, s.quantity, s.unit_price, s.total_price,
           s.transaction_date, s.invoice_number, s.notes, s.stock_version, s.created_by,
           u.full_name AS created_by_name, s.created_at, s.updated_at
    FROM stock_in s
    JOIN materials m ON m.id = s.material_id
    JOIN suppliers sp ON sp.id = s.supplier_id
    LEFT JOIN users u ON u.id = s.created_by
"#;

const FILTER_STOCK_IN: &str = r#"
    WHERE ($1::uuid IS NULL OR s.material_id = $1)
      AND ($2::uuid IS NULL OR s.supplier_id = $2)
      AND ($3::date IS NULL OR s.transaction_date >= $3)
      AND ($4::date IS NULL OR s.transaction_date <= $4)
      AND ($5::text IS NULL
           OR s.reference_number ILIKE '%' || $5 || '%'
           OR s.invoice_number ILIKE '%' || $5 || '%')
"#;

impl StockInService {
    /// Create a new StockInService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    /// Record a receipt and increment the material's stock in one transaction
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateStockInInput,
        today: NaiveDate,
    ) -> AppResult<StockMovement<StockIn>> {
        input.validate()?;

        let transaction_date = input.transaction_date.unwrap_or(today);
        if let Err(msg) = validate_transaction_date(transaction_date, today) {
            return Err(AppError::validation(
                "transaction_date",
                msg,
                "Tanggal transaksi tidak boleh di masa depan",
            ));
        }

        let total_price = stock::total_price(input.quantity, input.unit_price)?;

        // Start transaction
        let mut tx = self.db.begin().await?;

        stock_ledger::ensure_active_material(&mut tx, input.material_id).await?;
        ensure_active_supplier(&mut tx, input.supplier_id).await?;

        let reference_number = match input.reference_number {
            Some(reference) => {
                if stock_ledger::reference_exists(&mut tx, ReferencePrefix::StockIn, &reference).await? {
                    return Err(AppError::DuplicateEntry("reference_number".to_string()));
                }
                reference
            }
            None => {
                stock_ledger::next_reference_number(&mut tx, ReferencePrefix::StockIn, transaction_date)
                    .await?
            }
        };

        let level = stock_ledger::receive(&mut tx, input.material_id, input.quantity).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_in (
                reference_number, material_id, supplier_id, quantity, unit_price, total_price,
                transaction_date, invoice_number, notes, stock_version, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&reference_number)
        .bind(input.material_id)
        .bind(input.supplier_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(total_price)
        .bind(transaction_date)
        .bind(&input.invoice_number)
        .bind(&input.notes)
        .bind(level.stock_version)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let record = fetch_stock_in(&mut tx, id).await?;

        // Commit transaction
        tx.commit().await?;

        let before = level.current_stock - input.quantity;
        tracing::info!(
            material_id = %record.material_id,
            reference = %record.reference_number,
            before = %before,
            after = %level.current_stock,
            "Stock in recorded"
        );

        self.activity
            .record(
                actor,
                EntityType::StockIn,
                "create",
                Some(record.id),
                &format!(
                    "Recorded stock in {} of {} {} for {}",
                    record.reference_number,
                    record.quantity,
                    record.unit.as_str(),
                    record.material_code
                ),
            )
            .await;

        Ok(StockMovement {
            record,
            stock_before: before,
            stock_after: level.current_stock,
        })
    }

    /// Get a receipt by ID
    pub async fn get(&self, id: Uuid) -> AppResult<StockIn> {
        let mut conn = self.db.acquire().await?;
        fetch_stock_in(&mut conn, id).await
    }

    /// List receipts, newest first
    pub async fn list(
        &self,
        filter: &StockInFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockIn>> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_in s {}",
            FILTER_STOCK_IN
        ))
        .bind(filter.material_id)
        .bind(filter.supplier_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&filter.q)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, StockIn>(&format!(
            "{} {} ORDER BY s.transaction_date DESC, s.created_at DESC LIMIT $6 OFFSET $7",
            SELECT_STOCK_IN, FILTER_STOCK_IN
        ))
        .bind(filter.material_id)
        .bind(filter.supplier_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(&filter.q)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// Receipts dated `today`
    pub async fn list_for_day(&self, day: NaiveDate) -> AppResult<Vec<StockIn>> {
        let items = sqlx::query_as::<_, StockIn>(&format!(
            "{} WHERE s.transaction_date = $1 ORDER BY s.created_at DESC",
            SELECT_STOCK_IN
        ))
        .bind(day)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Edit the non-quantity fields of a receipt
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateStockInInput,
        today: NaiveDate,
    ) -> AppResult<StockIn> {
        input.validate()?;

        if input.is_empty() {
            return Err(AppError::validation(
                "body",
                "No editable fields supplied",
                "Tidak ada data yang diubah",
            ));
        }

        if let Some(date) = input.transaction_date {
            if let Err(msg) = validate_transaction_date(date, today) {
                return Err(AppError::validation(
                    "transaction_date",
                    msg,
                    "Tanggal transaksi tidak boleh di masa depan",
                ));
            }
        }

        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_in WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Stock in".to_string()));
        }

        if let Some(supplier_id) = input.supplier_id {
            ensure_active_supplier(&mut tx, supplier_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE stock_in
            SET supplier_id = COALESCE($2, supplier_id),
                transaction_date = COALESCE($3, transaction_date),
                invoice_number = COALESCE($4, invoice_number),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.supplier_id)
        .bind(input.transaction_date)
        .bind(&input.invoice_number)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await?;

        let record = fetch_stock_in(&mut tx, id).await?;
        tx.commit().await?;

        self.activity
            .record(
                actor,
                EntityType::StockIn,
                "update",
                Some(record.id),
                &format!("Updated stock in {}", record.reference_number),
            )
            .await;

        Ok(record)
    }

    /// Delete a receipt and take its quantity back out of stock
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<StockMovement<Uuid>> {
        let mut tx = self.db.begin().await?;

        let receipt = sqlx::query_as::<_, ReceiptLock>(
            "SELECT material_id, reference_number, quantity, stock_version FROM stock_in WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock in".to_string()))?;

        let material = stock_ledger::lock_material(&mut tx, receipt.material_id).await?;
        stock_ledger::ensure_no_later_adjustment(&mut tx, material.id, receipt.stock_version).await?;

        let change = stock::reverse(material.current_stock, receipt.quantity).map_err(|e| match e {
            StockError::InsufficientStock { available, requested } => AppError::business_rule(
                "REVERSAL_BELOW_ZERO",
                format!(
                    "Cannot delete: current stock {} is lower than the received quantity {}",
                    available, requested
                ),
                format!(
                    "Tidak dapat menghapus: stok saat ini {} lebih kecil dari jumlah masuk {}",
                    available, requested
                ),
            ),
            other => other.into(),
        })?;

        stock_ledger::set_stock(&mut tx, material.id, change.after).await?;

        sqlx::query("DELETE FROM stock_in WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            material_id = %material.id,
            reference = %receipt.reference_number,
            before = %change.before,
            after = %change.after,
            "Stock in deleted and reversed"
        );

        self.activity
            .record(
                actor,
                EntityType::StockIn,
                "delete",
                Some(id),
                &format!(
                    "Deleted stock in {} and reversed {} of {}",
                    receipt.reference_number, receipt.quantity, material.code
                ),
            )
            .await;

        Ok(StockMovement {
            record: id,
            stock_before: change.before,
            stock_after: change.after,
        })
    }

    /// Aggregate figures for an optional date range
    pub async fn stats(&self, range: Option<DateRange>) -> AppResult<StockInStats> {
        let (start, end) = (range.map(|r| r.start), range.map(|r| r.end));

        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT COUNT(*) AS total_transactions,
                   COALESCE(SUM(quantity), 0) AS total_quantity,
                   COALESCE(SUM(total_price), 0) AS total_value,
                   AVG(total_price) AS average_value,
                   COUNT(DISTINCT material_id) AS distinct_materials,
                   COUNT(DISTINCT supplier_id) AS distinct_suppliers
            FROM stock_in
            WHERE ($1::date IS NULL OR transaction_date >= $1)
              AND ($2::date IS NULL OR transaction_date <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        let top_materials = sqlx::query_as::<_, TopReceiptEntry>(
            r#"
            SELECT m.id, m.name, COUNT(s.id) AS transactions,
                   SUM(s.quantity) AS total_quantity, SUM(s.total_price) AS total_value
            FROM stock_in s
            JOIN materials m ON m.id = s.material_id
            WHERE ($1::date IS NULL OR s.transaction_date >= $1)
              AND ($2::date IS NULL OR s.transaction_date <= $2)
            GROUP BY m.id, m.name
            ORDER BY total_value DESC
            LIMIT 5
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        let top_suppliers = sqlx::query_as::<_, TopReceiptEntry>(
            r#"
            SELECT sp.id, sp.name, COUNT(s.id) AS transactions,
                   SUM(s.quantity) AS total_quantity, SUM(s.total_price) AS total_value
            FROM stock_in s
            JOIN suppliers sp ON sp.id = s.supplier_id
            WHERE ($1::date IS NULL OR s.transaction_date >= $1)
              AND ($2::date IS NULL OR s.transaction_date <= $2)
            GROUP BY sp.id, sp.name
            ORDER BY total_value DESC
            LIMIT 5
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        Ok(StockInStats {
            total_transactions: row.total_transactions,
            total_quantity: row.total_quantity,
            total_value: row.total_value,
            average_value: row.average_value.unwrap_or_default().round_dp(2),
            distinct_materials: row.distinct_materials,
            distinct_suppliers: row.distinct_suppliers,
            top_materials,
            top_suppliers,
        })
    }

    /// Receipts per month for a year; months without receipts are zero-filled
    pub async fn monthly_summary(&self, year: i32) -> AppResult<Vec<MonthlyReceipts>> {
        if let Err(msg) = shared::validate_report_year(year) {
            return Err(AppError::validation("year", msg, "Tahun harus antara 2000 dan 2100"));
        }

        let rows = sqlx::query_as::<_, MonthlyReceipts>(
            r#"
            SELECT EXTRACT(MONTH FROM transaction_date)::int AS month,
                   COUNT(*) AS transactions,
                   COALESCE(SUM(quantity), 0) AS total_quantity,
                   COALESCE(SUM(total_price), 0) AS total_value
            FROM stock_in
            WHERE EXTRACT(YEAR FROM transaction_date)::int = $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(year)
        .fetch_all(&self.db)
        .await?;

        Ok(fill_months(rows))
    }
}

/// Ensure one entry per month, 1 through 12
fn fill_months(rows: Vec<MonthlyReceipts>) -> Vec<MonthlyReceipts> {
    (1..=12)
        .map(|month| {
            rows.iter()
                .find(|r| r.month == month)
                .cloned()
                .unwrap_or(MonthlyReceipts {
                    month,
                    transactions: 0,
                    total_quantity: Decimal::ZERO,
                    total_value: Decimal::ZERO,
                })
        })
        .collect()
}

async fn fetch_stock_in(conn: &mut PgConnection, id: Uuid) -> AppResult<StockIn> {
    sqlx::query_as::<_, StockIn>(&format!("{} WHERE s.id = $1", SELECT_STOCK_IN))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock in".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_months_zero_fills() {
        let rows = vec![MonthlyReceipts {
            month: 3,
            transactions: 2,
            total_quantity: Decimal::from(30),
            total_value: Decimal::from(450),
        }];

        let months = fill_months(rows);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].transactions, 0);
        assert_eq!(months[2].total_value, Decimal::from(450));
        assert_eq!(months[11].month, 12);
    }
}
