//! Material category service

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    CategoryFilter, CreateCategoryInput, EntityType, PaginatedResponse, Pagination,
    UpdateCategoryInput,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};

#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
    activity: ActivityLogService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub material_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_CATEGORIES: &str = r#"
    SELECT c.id, c.name, c.description,
           (SELECT COUNT(*) FROM materials m WHERE m.category_id = c.id) AS material_count,
           c.created_at, c.updated_at
    FROM categories c
"#;

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    pub async fn list(
        &self,
        filter: &CategoryFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Category>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories c WHERE ($1::text IS NULL OR c.name ILIKE '%' || $1 || '%')",
        )
        .bind(&filter.q)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, Category>(&format!(
            "{} WHERE ($1::text IS NULL OR c.name ILIKE '%' || $1 || '%') ORDER BY c.name LIMIT $2 OFFSET $3",
            SELECT_CATEGORIES
        ))
        .bind(&filter.q)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(&format!("{} WHERE c.id = $1", SELECT_CATEGORIES))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    pub async fn create(&self, actor: &Actor, input: CreateCategoryInput) -> AppResult<Category> {
        input.validate()?;

        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        let category = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::Category,
                "create",
                Some(id),
                &format!("Created category {}", category.name),
            )
            .await;

        Ok(category)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateCategoryInput) -> AppResult<Category> {
        input.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.description)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }

        let category = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::Category,
                "update",
                Some(id),
                &format!("Updated category {}", category.name),
            )
            .await;

        Ok(category)
    }

    /// Hard delete, refused while any material references the category
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let category = self.get(id).await?;

        if category.material_count > 0 {
            return Err(AppError::Conflict {
                resource: "category".to_string(),
                message: format!(
                    "Category is used by {} material(s)",
                    category.material_count
                ),
                message_id: format!(
                    "Kategori masih digunakan oleh {} material",
                    category.material_count
                ),
            });
        }

        // A material assigned between the check and here trips the foreign key
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        self.activity
            .record(
                actor,
                EntityType::Category,
                "delete",
                Some(id),
                &format!("Deleted category {}", category.name),
            )
            .await;

        Ok(())
    }
}
