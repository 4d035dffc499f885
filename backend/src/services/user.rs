//! User account service

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    validate_email, validate_password, validate_username, CreateUserInput, EntityType,
    PaginatedResponse, Pagination, RecordStatus, RoleCode, UpdateUserInput, UserFilter,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity_log::{ActivityLogService, Actor};

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
    activity: ActivityLogService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub role_name: String,
    pub status: RecordStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_USERS: &str = r#"
    SELECT u.id, u.username, u.email, u.full_name, r.code AS role, r.name AS role_name,
           u.status, u.last_login_at, u.created_at, u.updated_at
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

const FILTER_USERS: &str = r#"
    WHERE ($1::record_status IS NULL OR u.status = $1)
      AND ($2::text IS NULL OR r.code = $2)
      AND ($3::text IS NULL
           OR u.username ILIKE '%' || $3 || '%'
           OR u.email ILIKE '%' || $3 || '%'
           OR u.full_name ILIKE '%' || $3 || '%')
"#;

fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

async fn role_id(conn: &mut PgConnection, role: RoleCode) -> AppResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM roles WHERE code = $1")
        .bind(role.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Role".to_string()))
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    pub async fn list(&self, filter: &UserFilter, pagination: &Pagination) -> AppResult<PaginatedResponse<User>> {
        let role = filter.role.map(|r| r.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users u JOIN roles r ON r.id = u.role_id {}",
            FILTER_USERS
        ))
        .bind(filter.status)
        .bind(role)
        .bind(&filter.q)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, User>(&format!(
            "{} {} ORDER BY u.username LIMIT $4 OFFSET $5",
            SELECT_USERS, FILTER_USERS
        ))
        .bind(filter.status)
        .bind(role)
        .bind(&filter.q)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("{} WHERE u.id = $1", SELECT_USERS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn create(&self, actor: &Actor, input: CreateUserInput) -> AppResult<User> {
        input.validate()?;

        let password_hash = hash_password(&input.password)?;
        let mut conn = self.db.acquire().await?;
        let role_id = role_id(&mut conn, input.role).await?;

        // Unique violations on username/email surface as 409
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (role_id, username, email, password_hash, full_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(role_id)
        .bind(input.username.trim())
        .bind(input.email.trim().to_lowercase())
        .bind(&password_hash)
        .bind(input.full_name.trim())
        .fetch_one(&mut *conn)
        .await?;
        drop(conn);

        let user = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::User,
                "create",
                Some(id),
                &format!("Created user {} with role {}", user.username, user.role),
            )
            .await;

        Ok(user)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        input.validate()?;

        let password_hash = input.password.as_deref().map(hash_password).transpose()?;
        let mut conn = self.db.acquire().await?;
        let role_id = match input.role {
            Some(role) => Some(role_id(&mut conn, role).await?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                role_id = COALESCE($4, role_id),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.email.map(|e| e.trim().to_lowercase()))
        .bind(input.full_name.as_deref().map(str::trim))
        .bind(role_id)
        .bind(password_hash)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        let user = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::User,
                "update",
                Some(id),
                &format!("Updated user {}", user.username),
            )
            .await;

        Ok(user)
    }

    /// Soft delete; revokes the user's refresh tokens
    pub async fn deactivate(&self, actor: &Actor, id: Uuid) -> AppResult<User> {
        if actor.user_id == Some(id) {
            return Err(AppError::business_rule(
                "SELF_DEACTIVATION",
                "You cannot deactivate your own account",
                "Anda tidak dapat menonaktifkan akun sendiri",
            ));
        }

        let mut tx = self.db.begin().await?;

        let result = sqlx::query("UPDATE users SET status = 'inactive', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let user = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::User,
                "deactivate",
                Some(id),
                &format!("Deactivated user {}", user.username),
            )
            .await;

        Ok(user)
    }

    pub async fn activate(&self, actor: &Actor, id: Uuid) -> AppResult<User> {
        let result = sqlx::query("UPDATE users SET status = 'active', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        let user = self.get(id).await?;

        self.activity
            .record(
                actor,
                EntityType::User,
                "activate",
                Some(id),
                &format!("Activated user {}", user.username),
            )
            .await;

        Ok(user)
    }

    /// Create the first administrator when no users exist yet.
    ///
    /// Returns whether an account was created.
    pub async fn bootstrap_admin(&self, username: &str, email: &str, password: &str) -> AppResult<bool> {
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        if existing > 0 {
            return Ok(false);
        }

        for (field, check) in [
            ("username", validate_username(username)),
            ("email", validate_email(email)),
            ("password", validate_password(password)),
        ] {
            if let Err(msg) = check {
                return Err(AppError::validation(field, msg, "Konfigurasi admin awal tidak valid"));
            }
        }

        let password_hash = hash_password(password)?;
        let mut conn = self.db.acquire().await?;
        let role_id = role_id(&mut conn, RoleCode::Admin).await?;

        sqlx::query(
            r#"
            INSERT INTO users (role_id, username, email, password_hash, full_name)
            VALUES ($1, $2, $3, $4, 'Administrator')
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(username)
        .bind(email.to_lowercase())
        .bind(&password_hash)
        .execute(&mut *conn)
        .await?;

        tracing::info!(username = %username, "Bootstrap administrator created");
        Ok(true)
    }
}
