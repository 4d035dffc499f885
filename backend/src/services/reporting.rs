//! Reporting service for inventory analytics and data export
//! Provides dashboard figures, transaction summaries, trends and supplier performance

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{DateRange, RecordStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Default window for trend reports
pub const DEFAULT_TREND_DAYS: u32 = 30;
/// Longest window for trend reports
pub const MAX_TREND_DAYS: u32 = 365;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Inventory snapshot with recent movement
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DashboardSummary {
    pub total_materials: i64,
    pub total_categories: i64,
    pub active_suppliers: i64,
    pub total_stock_value: Decimal,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub stock_in_count_7d: i64,
    pub stock_in_quantity_7d: Decimal,
    pub stock_in_value_7d: Decimal,
    pub stock_out_count_7d: i64,
    pub stock_out_quantity_7d: Decimal,
}

/// Per-material movement over a range
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MaterialMovementSummary {
    pub material_id: Uuid,
    pub code: String,
    pub name: String,
    pub quantity_in: Decimal,
    pub quantity_out: Decimal,
    pub adjustment: Decimal,
    pub net_change: Decimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MovementTotals {
    pub stock_in_count: i64,
    pub stock_in_quantity: Decimal,
    pub stock_in_value: Decimal,
    pub stock_out_count: i64,
    pub stock_out_quantity: Decimal,
    pub adjustment_count: i64,
    pub adjustment_net: Decimal,
}

/// Movement summary for a date range
#[derive(Debug, Serialize)]
pub struct TransactionSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub totals: MovementTotals,
    pub net_change: Decimal,
    pub top_materials: Vec<MaterialMovementSummary>,
}

/// Daily movement of one material
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TrendPoint {
    pub day: NaiveDate,
    pub stock_in: Decimal,
    pub stock_out: Decimal,
    pub adjustment: Decimal,
}

/// Materials per category
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryDistribution {
    pub category_id: Option<Uuid>,
    pub category_name: String,
    pub material_count: i64,
    pub active_count: i64,
    pub low_stock_count: i64,
}

/// Stock value per category with its share of the total
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryStockValue {
    pub category_id: Option<Uuid>,
    pub category_name: String,
    pub material_count: i64,
    pub total_stock_value: Decimal,
    pub share_percent: Decimal,
}

/// Receipts per supplier over a range
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SupplierPerformance {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub status: RecordStatus,
    pub receipts: i64,
    pub materials_supplied: i64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
    pub last_delivery: Option<NaiveDate>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Inventory totals plus the last seven days of movement ending `today`
    pub async fn dashboard(&self, today: NaiveDate) -> AppResult<DashboardSummary> {
        let window = DateRange::trailing_days(today, 7);

        let summary = sqlx::query_as::<_, DashboardSummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM materials WHERE status = 'active') AS total_materials,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COUNT(*) FROM suppliers WHERE status = 'active') AS active_suppliers,
                (SELECT COALESCE(SUM(ROUND(current_stock * unit_price, 2)), 0)
                   FROM materials WHERE status = 'active') AS total_stock_value,
                (SELECT COUNT(*) FROM materials
                   WHERE status = 'active' AND current_stock <= min_stock) AS low_stock_count,
                (SELECT COUNT(*) FROM materials
                   WHERE status = 'active' AND current_stock = 0) AS out_of_stock_count,
                (SELECT COUNT(*) FROM stock_in
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_in_count_7d,
                (SELECT COALESCE(SUM(quantity), 0) FROM stock_in
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_in_quantity_7d,
                (SELECT COALESCE(SUM(total_price), 0) FROM stock_in
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_in_value_7d,
                (SELECT COUNT(*) FROM stock_out
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_out_count_7d,
                (SELECT COALESCE(SUM(quantity), 0) FROM stock_out
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_out_quantity_7d
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.db)
        .await?;

        Ok(summary)
    }

    /// In/out/adjustment totals and the ten most active materials
    pub async fn transaction_summary(&self, range: DateRange) -> AppResult<TransactionSummary> {
        let totals = sqlx::query_as::<_, MovementTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM stock_in WHERE transaction_date BETWEEN $1 AND $2) AS stock_in_count,
                (SELECT COALESCE(SUM(quantity), 0) FROM stock_in
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_in_quantity,
                (SELECT COALESCE(SUM(total_price), 0) FROM stock_in
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_in_value,
                (SELECT COUNT(*) FROM stock_out WHERE transaction_date BETWEEN $1 AND $2) AS stock_out_count,
                (SELECT COALESCE(SUM(quantity), 0) FROM stock_out
                   WHERE transaction_date BETWEEN $1 AND $2) AS stock_out_quantity,
                (SELECT COUNT(*) FROM stock_adjustments
                   WHERE adjustment_date BETWEEN $1 AND $2) AS adjustment_count,
                (SELECT COALESCE(SUM(difference), 0) FROM stock_adjustments
                   WHERE adjustment_date BETWEEN $1 AND $2) AS adjustment_net
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        let top_materials = sqlx::query_as::<_, MaterialMovementSummary>(
            r#"
            WITH movement AS (
                SELECT material_id, quantity AS qty_in, 0::numeric AS qty_out, 0::numeric AS adj
                FROM stock_in WHERE transaction_date BETWEEN $1 AND $2
                UNION ALL
                SELECT material_id, 0, quantity, 0
                FROM stock_out WHERE transaction_date BETWEEN $1 AND $2
                UNION ALL
                SELECT material_id, 0, 0, difference
                FROM stock_adjustments WHERE adjustment_date BETWEEN $1 AND $2
            )
            SELECT m.id AS material_id, m.code, m.name,
                   SUM(mv.qty_in) AS quantity_in,
                   SUM(mv.qty_out) AS quantity_out,
                   SUM(mv.adj) AS adjustment,
                   SUM(mv.qty_in) - SUM(mv.qty_out) + SUM(mv.adj) AS net_change
            FROM movement mv
            JOIN materials m ON m.id = mv.material_id
            GROUP BY m.id, m.code, m.name
            ORDER BY SUM(mv.qty_in) + SUM(mv.qty_out) + SUM(ABS(mv.adj)) DESC
            LIMIT 10
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let net_change =
            totals.stock_in_quantity - totals.stock_out_quantity + totals.adjustment_net;

        Ok(TransactionSummary {
            start: range.start,
            end: range.end,
            totals,
            net_change,
            top_materials,
        })
    }

    /// Daily in/out/adjustment sums for a material over the `days` days ending `today`
    pub async fn material_trend(
        &self,
        material_id: Uuid,
        days: u32,
        today: NaiveDate,
    ) -> AppResult<Vec<TrendPoint>> {
        if days == 0 || days > MAX_TREND_DAYS {
            return Err(AppError::validation(
                "days",
                "Days must be between 1 and 365",
                "Jumlah hari harus antara 1 dan 365",
            ));
        }

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1)")
            .bind(material_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(AppError::NotFound("Material".to_string()));
        }

        let window = DateRange::trailing_days(today, days);

        let points = sqlx::query_as::<_, TrendPoint>(
            r#"
            SELECT d::date AS day,
                   COALESCE((SELECT SUM(quantity) FROM stock_in
                             WHERE material_id = $1 AND transaction_date = d::date), 0) AS stock_in,
                   COALESCE((SELECT SUM(quantity) FROM stock_out
                             WHERE material_id = $1 AND transaction_date = d::date), 0) AS stock_out,
                   COALESCE((SELECT SUM(difference) FROM stock_adjustments
                             WHERE material_id = $1 AND adjustment_date = d::date), 0) AS adjustment
            FROM generate_series($2::date, $3::date, INTERVAL '1 day') AS d
            ORDER BY day
            "#,
        )
        .bind(material_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.db)
        .await?;

        Ok(points)
    }

    pub async fn category_distribution(&self) -> AppResult<Vec<CategoryDistribution>> {
        let rows = sqlx::query_as::<_, CategoryDistribution>(
            r#"
            SELECT c.id AS category_id,
                   COALESCE(c.name, 'Uncategorized') AS category_name,
                   COUNT(m.id) AS material_count,
                   COUNT(m.id) FILTER (WHERE m.status = 'active') AS active_count,
                   COUNT(m.id) FILTER (WHERE m.status = 'active' AND m.current_stock <= m.min_stock)
                       AS low_stock_count
            FROM materials m
            LEFT JOIN categories c ON c.id = m.category_id
            GROUP BY c.id, c.name
            ORDER BY material_count DESC, category_name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn stock_value_by_category(&self) -> AppResult<Vec<CategoryStockValue>> {
        let rows = sqlx::query_as::<_, CategoryStockValue>(
            r#"
            WITH per_category AS (
                SELECT c.id AS category_id,
                       COALESCE(c.name, 'Uncategorized') AS category_name,
                       COUNT(m.id) AS material_count,
                       COALESCE(SUM(ROUND(m.current_stock * m.unit_price, 2)), 0) AS total_stock_value
                FROM materials m
                LEFT JOIN categories c ON c.id = m.category_id
                WHERE m.status = 'active'
                GROUP BY c.id, c.name
            )
            SELECT category_id, category_name, material_count, total_stock_value,
                   CASE WHEN SUM(total_stock_value) OVER () > 0
                        THEN ROUND(total_stock_value * 100 / SUM(total_stock_value) OVER (), 2)
                        ELSE 0 END AS share_percent
            FROM per_category
            ORDER BY total_stock_value DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn supplier_performance(&self, range: DateRange) -> AppResult<Vec<SupplierPerformance>> {
        let rows = sqlx::query_as::<_, SupplierPerformance>(
            r#"
            SELECT sp.id AS supplier_id, sp.name AS supplier_name, sp.status,
                   COUNT(s.id) AS receipts,
                   COUNT(DISTINCT s.material_id) AS materials_supplied,
                   COALESCE(SUM(s.quantity), 0) AS total_quantity,
                   COALESCE(SUM(s.total_price), 0) AS total_value,
                   MAX(s.transaction_date) AS last_delivery
            FROM suppliers sp
            LEFT JOIN stock_in s ON s.supplier_id = sp.id
                AND s.transaction_date BETWEEN $1 AND $2
            GROUP BY sp.id, sp.name, sp.status
            ORDER BY total_value DESC, sp.name
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_export_to_csv_writes_header_and_rows() {
        let rows = vec![
            SupplierPerformance {
                supplier_id: Uuid::nil(),
                supplier_name: "CV Sumber Makmur".to_string(),
                status: RecordStatus::Active,
                receipts: 3,
                materials_supplied: 2,
                total_quantity: Decimal::from_str("120.5").unwrap(),
                total_value: Decimal::from_str("1506250.00").unwrap(),
                last_delivery: NaiveDate::from_ymd_opt(2024, 3, 14),
            },
            SupplierPerformance {
                supplier_id: Uuid::nil(),
                supplier_name: "PT Baru".to_string(),
                status: RecordStatus::Inactive,
                receipts: 0,
                materials_supplied: 0,
                total_quantity: Decimal::ZERO,
                total_value: Decimal::ZERO,
                last_delivery: None,
            },
        ];

        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("supplier_id,supplier_name,status,receipts"));
        assert!(lines[1].contains("CV Sumber Makmur,active,3,2,120.5,1506250.00,2024-03-14"));
        assert!(lines[2].ends_with(",inactive,0,0,0,0,"));
    }
}
