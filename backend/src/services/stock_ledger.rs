//! Stock ledger: the only code that writes `materials.current_stock`
//!
//! Every function takes the caller's open transaction. Increments and
//! decrements are single conditional statements, so the row lock they take is
//! held until the caller commits; adjustments and reversals lock the row with
//! `SELECT ... FOR UPDATE` before reading the current level.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{reference, MaterialUnit, RecordStatus, ReferencePrefix};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Stock-relevant columns of a material row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MaterialStock {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub unit: MaterialUnit,
    pub current_stock: Decimal,
    pub stock_version: i64,
    pub status: RecordStatus,
}

/// Register value after a mutation
#[derive(Debug, Clone, Copy, Serialize, FromRow)]
pub struct StockLevel {
    pub current_stock: Decimal,
    pub stock_version: i64,
}

/// A committed mutation record with the register values around it
#[derive(Debug, Clone, Serialize)]
pub struct StockMovement<T> {
    pub record: T,
    pub stock_before: Decimal,
    pub stock_after: Decimal,
}

/// Read a material without locking it
pub async fn find_material(conn: &mut PgConnection, material_id: Uuid) -> AppResult<MaterialStock> {
    sqlx::query_as::<_, MaterialStock>(
        r#"
        SELECT id, code, name, unit, current_stock, stock_version, status
        FROM materials
        WHERE id = $1
        "#,
    )
    .bind(material_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Material".to_string()))
}

/// Lock a material row for the rest of the transaction and read it
pub async fn lock_material(conn: &mut PgConnection, material_id: Uuid) -> AppResult<MaterialStock> {
    sqlx::query_as::<_, MaterialStock>(
        r#"
        SELECT id, code, name, unit, current_stock, stock_version, status
        FROM materials
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(material_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Material".to_string()))
}

/// Fail unless the material exists and is active
pub async fn ensure_active_material(
    conn: &mut PgConnection,
    material_id: Uuid,
) -> AppResult<MaterialStock> {
    let material = find_material(conn, material_id).await?;
    ensure_active(&material)?;
    Ok(material)
}

pub fn ensure_active(material: &MaterialStock) -> AppResult<()> {
    if !material.status.is_active() {
        return Err(AppError::business_rule(
            "INACTIVE_MATERIAL",
            format!("Material {} is inactive", material.code),
            format!("Material {} tidak aktif", material.code),
        ));
    }
    Ok(())
}

/// Atomically add to an active material's stock
pub async fn receive(conn: &mut PgConnection, material_id: Uuid, quantity: Decimal) -> AppResult<StockLevel> {
    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        UPDATE materials
        SET current_stock = current_stock + $2,
            stock_version = stock_version + 1,
            updated_at = NOW()
        WHERE id = $1 AND status = 'active'
        RETURNING current_stock, stock_version
        "#,
    )
    .bind(material_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    match level {
        Some(level) => Ok(level),
        None => {
            // Distinguish missing from inactive
            let material = find_material(conn, material_id).await?;
            ensure_active(&material)?;
            Err(AppError::Internal("Stock increment affected no rows".to_string()))
        }
    }
}

/// Atomically subtract from an active material's stock.
///
/// The update only matches while `current_stock >= quantity`; no match means
/// the caller's transaction must be abandoned.
pub async fn issue(conn: &mut PgConnection, material_id: Uuid, quantity: Decimal) -> AppResult<StockLevel> {
    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        UPDATE materials
        SET current_stock = current_stock - $2,
            stock_version = stock_version + 1,
            updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND current_stock >= $2
        RETURNING current_stock, stock_version
        "#,
    )
    .bind(material_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    match level {
        Some(level) => Ok(level),
        None => {
            let material = find_material(conn, material_id).await?;
            ensure_active(&material)?;
            Err(AppError::InsufficientStock {
                available: material.current_stock,
                requested: quantity,
            })
        }
    }
}

/// Overwrite the stock of a material the caller has already locked
pub async fn set_stock(conn: &mut PgConnection, material_id: Uuid, new_stock: Decimal) -> AppResult<StockLevel> {
    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        UPDATE materials
        SET current_stock = $2,
            stock_version = stock_version + 1,
            updated_at = NOW()
        WHERE id = $1
        RETURNING current_stock, stock_version
        "#,
    )
    .bind(material_id)
    .bind(new_stock)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

    Ok(level)
}

/// Reject deleting a mutation record once a later adjustment exists.
///
/// A later adjustment replaced the stock with a physically counted value that
/// already reflects this record, so compensating it would corrupt the level.
pub async fn ensure_no_later_adjustment(
    conn: &mut PgConnection,
    material_id: Uuid,
    stock_version: i64,
) -> AppResult<()> {
    let later = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM stock_adjustments WHERE material_id = $1 AND stock_version > $2)",
    )
    .bind(material_id)
    .bind(stock_version)
    .fetch_one(&mut *conn)
    .await?;

    if later {
        return Err(AppError::business_rule(
            "OUT_OF_ORDER_DELETION",
            "A later stock adjustment exists for this material; delete it first",
            "Sudah ada penyesuaian stok yang lebih baru untuk material ini; hapus terlebih dahulu",
        ));
    }
    Ok(())
}

fn reference_table(prefix: ReferencePrefix) -> &'static str {
    match prefix {
        ReferencePrefix::StockIn => "stock_in",
        ReferencePrefix::StockOut => "stock_out",
    }
}

/// Whether a reference number is already taken
pub async fn reference_exists(
    conn: &mut PgConnection,
    prefix: ReferencePrefix,
    reference_number: &str,
) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE reference_number = $1)",
        reference_table(prefix)
    ))
    .bind(reference_number)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

/// Generate the next `<PREFIX><YYYYMMDD><seq>` reference inside the caller's transaction.
///
/// An advisory lock keyed on the day prefix serialises concurrent generators
/// until commit; the UNIQUE constraint remains the final guard.
pub async fn next_reference_number(
    conn: &mut PgConnection,
    prefix: ReferencePrefix,
    date: NaiveDate,
) -> AppResult<String> {
    let day_prefix = prefix.day_prefix(date);

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&day_prefix)
        .execute(&mut *conn)
        .await?;

    // Longer sequences sort first so 10000 beats 9999
    let last = sqlx::query_scalar::<_, String>(&format!(
        r#"
        SELECT reference_number FROM {}
        WHERE reference_number ~ $1
        ORDER BY LENGTH(reference_number) DESC, reference_number DESC
        LIMIT 1
        "#,
        reference_table(prefix)
    ))
    .bind(format!("^{}[0-9]+$", day_prefix))
    .fetch_optional(&mut *conn)
    .await?;

    Ok(reference::next_reference(prefix, date, last.as_deref())?)
}
