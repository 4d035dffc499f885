//! Supplier service

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    CreateSupplierInput, EntityType, PaginatedResponse, Pagination, RecordStatus, SupplierFilter,
    UpdateSupplierInput,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
    activity: ActivityLogService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: RecordStatus,
    pub material_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_SUPPLIERS: &str = r#"
    SELECT s.id, s.name, s.contact_person, s.phone, s.email, s.address, s.status,
           (SELECT COUNT(*) FROM materials m WHERE m.default_supplier_id = s.id) AS material_count,
           s.created_at, s.updated_at
    FROM suppliers s
"#;

const FILTER_SUPPLIERS: &str = r#"
    WHERE ($1::record_status IS NULL OR s.status = $1)
      AND ($2::text IS NULL
           OR s.name ILIKE '%' || $2 || '%'
           OR s.contact_person ILIKE '%' || $2 || '%'
           OR s.phone ILIKE '%' || $2 || '%'
           OR s.email ILIKE '%' || $2 || '%')
"#;

/// Fail unless the supplier exists and is active
pub async fn ensure_active_supplier(conn: &mut PgConnection, supplier_id: Uuid) -> AppResult<()> {
    let status = sqlx::query_scalar::<_, RecordStatus>("SELECT status FROM suppliers WHERE id = $1")
        .bind(supplier_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

    if !status.is_active() {
        return Err(AppError::business_rule(
            "INACTIVE_SUPPLIER",
            "Supplier is inactive",
            "Supplier tidak aktif",
        ));
    }
    Ok(())
}

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    pub async fn list(
        &self,
        filter: &SupplierFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM suppliers s {}",
            FILTER_SUPPLIERS
        ))
        .bind(filter.status)
        .bind(&filter.q)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, Supplier>(&format!(
            "{} {} ORDER BY s.name LIMIT $3 OFFSET $4",
            SELECT_SUPPLIERS, FILTER_SUPPLIERS
        ))
        .bind(filter.status)
        .bind(&filter.q)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    /// Active suppliers for selection lists
    pub async fn list_active(&self) -> AppResult<Vec<Supplier>> {
        let items = sqlx::query_as::<_, Supplier>(&format!(
            "{} WHERE s.status = 'active' ORDER BY s.name",
            SELECT_SUPPLIERS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!("{} WHERE s.id = $1", SELECT_SUPPLIERS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn create(&self, actor: &Actor, input: CreateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO suppliers (name, contact_person, phone, email, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        let supplier = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::Supplier,
                "create",
                Some(id),
                &format!("Created supplier {}", supplier.name),
            )
            .await;

        Ok(supplier)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = COALESCE($2, name),
                contact_person = COALESCE($3, contact_person),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                address = COALESCE($6, address),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        let supplier = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::Supplier,
                "update",
                Some(id),
                &format!("Updated supplier {}", supplier.name),
            )
            .await;

        Ok(supplier)
    }

    /// Soft delete. Refused while an active material names this supplier as its default.
    pub async fn deactivate(&self, actor: &Actor, id: Uuid) -> AppResult<Supplier> {
        let in_use = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM materials WHERE default_supplier_id = $1 AND status = 'active'",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if in_use > 0 {
            return Err(AppError::Conflict {
                resource: "supplier".to_string(),
                message: format!("Supplier is the default for {} active material(s)", in_use),
                message_id: format!("Supplier masih menjadi pemasok utama {} material aktif", in_use),
            });
        }

        self.set_status(actor, id, RecordStatus::Inactive).await
    }

    pub async fn activate(&self, actor: &Actor, id: Uuid) -> AppResult<Supplier> {
        self.set_status(actor, id, RecordStatus::Active).await
    }

    async fn set_status(&self, actor: &Actor, id: Uuid, status: RecordStatus) -> AppResult<Supplier> {
        let result = sqlx::query("UPDATE suppliers SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        let supplier = self.get(id).await?;
        let verb = if status.is_active() { "activate" } else { "deactivate" };

        self.activity
            .record(
                actor,
                EntityType::Supplier,
                verb,
                Some(id),
                &format!("Supplier {} set to {}", supplier.name, status),
            )
            .await;

        Ok(supplier)
    }
}
