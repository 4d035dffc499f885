//! Material service: master data and derived stock views
//!
//! `current_stock` is never written here except through an opening-stock
//! adjustment at creation time.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    stock_value, validate_stock_thresholds, AdjustmentReason, CreateMaterialInput, EntityType,
    MaterialFilter, MaterialUnit, PaginatedResponse, Pagination, RecordStatus, StockStatus,
    UpdateMaterialInput,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};
use crate::services::adjustment::record_adjustment;
use crate::services::stock_ledger;
use crate::services::supplier::ensure_active_supplier;

#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
    activity: ActivityLogService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Material {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub default_supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub unit: MaterialUnit,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub reorder_point: Decimal,
    pub unit_price: Decimal,
    pub stock_version: i64,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Material with its derived stock indicators
#[derive(Debug, Clone, Serialize)]
pub struct MaterialView {
    #[serde(flatten)]
    pub material: Material,
    pub stock_status: StockStatus,
    pub stock_value: Decimal,
}

impl From<Material> for MaterialView {
    fn from(material: Material) -> Self {
        Self {
            stock_status: StockStatus::classify(
                material.current_stock,
                material.min_stock,
                material.reorder_point,
            ),
            stock_value: stock_value(material.current_stock, material.unit_price),
            material,
        }
    }
}

/// Active material at or below its minimum
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockItem {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub unit: MaterialUnit,
    pub category_name: Option<String>,
    pub supplier_name: Option<String>,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub reorder_point: Decimal,
    pub shortage: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MaterialStats {
    pub total_active: i64,
    pub total_inactive: i64,
    pub total_stock_value: Decimal,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}

/// One stock-changing event in a material's history
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovementEntry {
    /// `in`, `out` or `adjustment`
    pub movement_type: String,
    pub id: Uuid,
    /// Reference number, or the reason for adjustments
    pub reference: String,
    pub movement_date: NaiveDate,
    pub quantity_change: Decimal,
    pub stock_version: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

const SELECT_MATERIALS: &str = r#"
    SELECT m.id, m.code, m.name, m.description, m.category_id, c.name AS category_name,
           m.default_supplier_id, s.name AS supplier_name, m.unit, m.current_stock,
           m.min_stock, m.reorder_point, m.unit_price, m.stock_version, m.status,
           m.created_at, m.updated_at
    FROM materials m
    LEFT JOIN categories c ON c.id = m.category_id
    LEFT JOIN suppliers s ON s.id = m.default_supplier_id
"#;

/// Same ordering as `StockStatus::classify`
const STOCK_STATUS_SQL: &str = r#"
    CASE WHEN m.current_stock <= 0 THEN 'empty'
         WHEN m.current_stock <= m.min_stock THEN 'low'
         WHEN m.current_stock <= m.reorder_point THEN 'warning'
         ELSE 'normal' END
"#;

fn filter_materials() -> String {
    format!(
        r#"
        WHERE ($1::uuid IS NULL OR m.category_id = $1)
          AND ($2::uuid IS NULL OR m.default_supplier_id = $2)
          AND ($3::record_status IS NULL OR m.status = $3)
          AND ($4::text IS NULL OR {} = $4)
          AND ($5::text IS NULL OR m.code ILIKE '%' || $5 || '%' OR m.name ILIKE '%' || $5 || '%')
        "#,
        STOCK_STATUS_SQL
    )
}

const MOVEMENTS_SQL: &str = r#"
    SELECT 'in' AS movement_type, id, reference_number AS reference,
           transaction_date AS movement_date, quantity AS quantity_change,
           stock_version, notes, created_at
    FROM stock_in WHERE material_id = $1
    UNION ALL
    SELECT 'out', id, reference_number, transaction_date, -quantity, stock_version, notes, created_at
    FROM stock_out WHERE material_id = $1
    UNION ALL
    SELECT 'adjustment', id, reason::text, adjustment_date, difference, stock_version, notes, created_at
    FROM stock_adjustments WHERE material_id = $1
"#;

impl MaterialService {
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    pub async fn list(
        &self,
        filter: &MaterialFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<MaterialView>> {
        let where_clause = filter_materials();
        let stock_status = filter.stock_status.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM materials m {}",
            where_clause
        ))
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.status)
        .bind(stock_status)
        .bind(&filter.q)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, Material>(&format!(
            "{} {} ORDER BY m.code LIMIT $6 OFFSET $7",
            SELECT_MATERIALS, where_clause
        ))
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.status)
        .bind(stock_status)
        .bind(&filter.q)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let items = rows.into_iter().map(MaterialView::from).collect();
        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<MaterialView> {
        let mut conn = self.db.acquire().await?;
        fetch_material(&mut conn, id).await.map(MaterialView::from)
    }

    /// Create a material. Opening stock is booked as a count-correction
    /// adjustment from zero inside the same transaction.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateMaterialInput,
        today: NaiveDate,
    ) -> AppResult<MaterialView> {
        let input = input.normalized();
        input.validate()?;

        let min_stock = input.min_stock.unwrap_or_default();
        let reorder_point = input.reorder_point.unwrap_or(min_stock);
        if let Err(msg) = validate_stock_thresholds(min_stock, reorder_point) {
            return Err(AppError::validation(
                "reorder_point",
                msg,
                "Titik pemesanan ulang tidak boleh lebih kecil dari stok minimum",
            ));
        }

        let mut tx = self.db.begin().await?;

        if let Some(category_id) = input.category_id {
            ensure_category_exists(&mut tx, category_id).await?;
        }
        if let Some(supplier_id) = input.default_supplier_id {
            ensure_active_supplier(&mut tx, supplier_id).await?;
        }

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO materials (
                code, name, description, category_id, default_supplier_id, unit,
                min_stock, reorder_point, unit_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.default_supplier_id)
        .bind(input.unit)
        .bind(min_stock)
        .bind(reorder_point)
        .bind(input.unit_price.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(opening) = input.opening_stock.filter(|q| *q > Decimal::ZERO) {
            let material = stock_ledger::lock_material(&mut tx, id).await?;
            record_adjustment(
                &mut tx,
                id,
                material.current_stock,
                opening,
                AdjustmentReason::CountCorrection,
                Some("Opening stock"),
                today,
                actor.user_id,
            )
            .await?;
        }

        let material = fetch_material(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(material_id = %id, code = %material.code, "Material created");

        self.activity
            .record(
                actor,
                EntityType::Material,
                "create",
                Some(id),
                &format!("Created material {} ({})", material.code, material.name),
            )
            .await;

        Ok(material.into())
    }

    /// Update descriptive fields and thresholds
    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateMaterialInput) -> AppResult<MaterialView> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let existing = fetch_material(&mut tx, id).await?;

        let min_stock = input.min_stock.unwrap_or(existing.min_stock);
        let reorder_point = input.reorder_point.unwrap_or(existing.reorder_point);
        if let Err(msg) = validate_stock_thresholds(min_stock, reorder_point) {
            return Err(AppError::validation(
                "reorder_point",
                msg,
                "Titik pemesanan ulang tidak boleh lebih kecil dari stok minimum",
            ));
        }

        if let Some(category_id) = input.category_id {
            ensure_category_exists(&mut tx, category_id).await?;
        }
        if let Some(supplier_id) = input.default_supplier_id {
            if existing.default_supplier_id != Some(supplier_id) {
                ensure_active_supplier(&mut tx, supplier_id).await?;
            }
        }

        sqlx::query(
            r#"
            UPDATE materials
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                default_supplier_id = COALESCE($5, default_supplier_id),
                unit = COALESCE($6, unit),
                min_stock = $7,
                reorder_point = $8,
                unit_price = COALESCE($9, unit_price),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.default_supplier_id)
        .bind(input.unit)
        .bind(min_stock)
        .bind(reorder_point)
        .bind(input.unit_price)
        .execute(&mut *tx)
        .await?;

        let material = fetch_material(&mut tx, id).await?;
        tx.commit().await?;

        self.activity
            .record(
                actor,
                EntityType::Material,
                "update",
                Some(id),
                &format!("Updated material {}", material.code),
            )
            .await;

        Ok(material.into())
    }

    pub async fn deactivate(&self, actor: &Actor, id: Uuid) -> AppResult<MaterialView> {
        self.set_status(actor, id, RecordStatus::Inactive).await
    }

    pub async fn activate(&self, actor: &Actor, id: Uuid) -> AppResult<MaterialView> {
        self.set_status(actor, id, RecordStatus::Active).await
    }

    async fn set_status(&self, actor: &Actor, id: Uuid, status: RecordStatus) -> AppResult<MaterialView> {
        let result = sqlx::query("UPDATE materials SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Material".to_string()));
        }

        let material = self.get(id).await?;
        let verb = if status.is_active() { "activate" } else { "deactivate" };

        self.activity
            .record(
                actor,
                EntityType::Material,
                verb,
                Some(id),
                &format!("Material {} set to {}", material.material.code, status),
            )
            .await;

        Ok(material)
    }

    /// Active materials at or below minimum stock, largest shortage first
    pub async fn low_stock(&self) -> AppResult<Vec<LowStockItem>> {
        let items = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT m.id, m.code, m.name, m.unit, c.name AS category_name, s.name AS supplier_name,
                   m.current_stock, m.min_stock, m.reorder_point,
                   m.min_stock - m.current_stock AS shortage
            FROM materials m
            LEFT JOIN categories c ON c.id = m.category_id
            LEFT JOIN suppliers s ON s.id = m.default_supplier_id
            WHERE m.status = 'active' AND m.current_stock <= m.min_stock
            ORDER BY shortage DESC, m.code
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn out_of_stock(&self) -> AppResult<Vec<MaterialView>> {
        let rows = sqlx::query_as::<_, Material>(&format!(
            "{} WHERE m.status = 'active' AND m.current_stock = 0 ORDER BY m.code",
            SELECT_MATERIALS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(MaterialView::from).collect())
    }

    pub async fn stats(&self) -> AppResult<MaterialStats> {
        let stats = sqlx::query_as::<_, MaterialStats>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'active') AS total_active,
                   COUNT(*) FILTER (WHERE status = 'inactive') AS total_inactive,
                   COALESCE(SUM(ROUND(current_stock * unit_price, 2)) FILTER (WHERE status = 'active'), 0)
                       AS total_stock_value,
                   COUNT(*) FILTER (WHERE status = 'active' AND current_stock <= min_stock) AS low_stock_count,
                   COUNT(*) FILTER (WHERE status = 'active' AND current_stock = 0) AS out_of_stock_count
            FROM materials
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    /// Every stock-changing record for a material, newest mutation first
    pub async fn movements(
        &self,
        id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockMovementEntry>> {
        // 404 for unknown materials rather than an empty page
        let mut conn = self.db.acquire().await?;
        stock_ledger::find_material(&mut conn, id).await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM ({}) h",
            MOVEMENTS_SQL
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        let items = sqlx::query_as::<_, StockMovementEntry>(&format!(
            "SELECT * FROM ({}) h ORDER BY h.stock_version DESC LIMIT $2 OFFSET $3",
            MOVEMENTS_SQL
        ))
        .bind(id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&mut *conn)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }
}

async fn fetch_material(conn: &mut PgConnection, id: Uuid) -> AppResult<Material> {
    sqlx::query_as::<_, Material>(&format!("{} WHERE m.id = $1", SELECT_MATERIALS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))
}

async fn ensure_category_exists(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    if !exists {
        return Err(AppError::NotFound("Category".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn material(current: &str, min: &str, reorder: &str) -> Material {
        Material {
            id: Uuid::new_v4(),
            code: "TPG-01".to_string(),
            name: "Tepung Terigu".to_string(),
            description: None,
            category_id: None,
            category_name: None,
            default_supplier_id: None,
            supplier_name: None,
            unit: MaterialUnit::Kg,
            current_stock: Decimal::from_str(current).unwrap(),
            min_stock: Decimal::from_str(min).unwrap(),
            reorder_point: Decimal::from_str(reorder).unwrap(),
            unit_price: Decimal::from_str("12500").unwrap(),
            stock_version: 3,
            status: RecordStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_derives_status_and_value() {
        let view = MaterialView::from(material("8", "10", "20"));
        assert_eq!(view.stock_status, StockStatus::Low);
        assert_eq!(view.stock_value, Decimal::from(100_000));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["code"], "TPG-01");
        assert_eq!(json["stock_status"], "low");
    }

    #[test]
    fn test_view_empty_stock() {
        let view = MaterialView::from(material("0", "0", "0"));
        assert_eq!(view.stock_status, StockStatus::Empty);
        assert_eq!(view.stock_value, Decimal::ZERO);
    }
}
