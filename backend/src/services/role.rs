//! Role service: built-in roles and their permission sets

use serde::Serialize;
use shared::{EntityType, UpdateRolePermissionsInput};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};

/// Role service
#[derive(Clone)]
pub struct RoleService {
    db: PgPool,
    activity: ActivityLogService,
}

/// Role with usage counts
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub permission_count: i64,
    pub user_count: i64,
}

/// Permission information
#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

/// Role with its permissions
#[derive(Debug, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

const SELECT_ROLES: &str = r#"
    SELECT r.id, r.code, r.name, r.description,
           (SELECT COUNT(*) FROM role_permissions rp WHERE rp.role_id = r.id) AS permission_count,
           (SELECT COUNT(*) FROM users u WHERE u.role_id = r.id) AS user_count
    FROM roles r
"#;

impl RoleService {
    /// Create a new RoleService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    /// All roles, most privileged first
    pub async fn list(&self) -> AppResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "{} ORDER BY permission_count DESC, r.code",
            SELECT_ROLES
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    /// Get a role by ID with its permissions
    pub async fn get(&self, role_id: Uuid) -> AppResult<RoleWithPermissions> {
        let role = sqlx::query_as::<_, Role>(&format!("{} WHERE r.id = $1", SELECT_ROLES))
            .bind(role_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Role".to_string()))?;

        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.resource, p.action, p.description
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(RoleWithPermissions { role, permissions })
    }

    /// Get all available permissions
    pub async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, resource, action, description FROM permissions ORDER BY resource, action",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// Replace a role's permission set
    pub async fn update_permissions(
        &self,
        actor: &Actor,
        role_id: Uuid,
        input: UpdateRolePermissionsInput,
    ) -> AppResult<RoleWithPermissions> {
        let mut permission_ids = input.permission_ids;
        permission_ids.sort_unstable();
        permission_ids.dedup();

        let mut tx = self.db.begin().await?;

        let code = sqlx::query_scalar::<_, String>("SELECT code FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Role".to_string()))?;

        // Validate permission IDs exist
        let valid_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM permissions WHERE id = ANY($1)",
        )
        .bind(&permission_ids)
        .fetch_one(&mut *tx)
        .await?;

        if valid_count != permission_ids.len() as i64 {
            return Err(AppError::validation(
                "permission_ids",
                "One or more permission IDs are invalid",
                "Satu atau lebih ID izin tidak valid",
            ));
        }

        // The administrator role must keep the ability to manage roles
        if code == "admin" {
            let keeps_role_update = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM permissions WHERE id = ANY($1) AND resource = 'role' AND action = 'update')",
            )
            .bind(&permission_ids)
            .fetch_one(&mut *tx)
            .await?;

            if !keeps_role_update {
                return Err(AppError::business_rule(
                    "ADMIN_LOCKOUT",
                    "The admin role cannot lose the role:update permission",
                    "Peran admin tidak boleh kehilangan izin role:update",
                ));
            }
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(role_id)
        .bind(&permission_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(role = %code, permissions = permission_ids.len(), "Role permissions replaced");

        self.activity
            .record(
                actor,
                EntityType::Role,
                "update",
                Some(role_id),
                &format!("Replaced permissions of role {} ({} granted)", code, permission_ids.len()),
            )
            .await;

        self.get(role_id).await
    }
}
