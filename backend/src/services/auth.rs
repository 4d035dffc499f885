//! Authentication service for login, token rotation and session lookup

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::verify;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::{EntityType, LoginInput, RecordStatus, RefreshTokenInput};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::Claims;
use crate::services::activity_log::{ActivityLogService, Actor};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    activity: ActivityLogService,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Response after a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: AuthTokens,
    pub user: UserProfile,
}

/// The signed-in user with role and effective permissions
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub role_name: String,
    pub status: RecordStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub permissions: Vec<String>,
}

/// Credentials row
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: String,
    status: RecordStatus,
}

#[derive(Debug, FromRow)]
struct RefreshRow {
    id: Uuid,
    user_id: Uuid,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Authenticate with a username or email and a password
    pub async fn login(&self, input: LoginInput, client: &Actor) -> AppResult<LoginResponse> {
        input.validate()?;

        let login = input.login.trim();
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.username, u.password_hash, r.code AS role, u.status
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1 OR LOWER(u.email) = LOWER($1)
            "#,
        )
        .bind(login)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        // Verify password
        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            tracing::warn!(login = %login, "Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }

        // Check if user is active
        if !user.status.is_active() {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_id: "Akun dinonaktifkan".to_string(),
            });
        }

        // Update last login
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let permissions = self.user_permissions(user.id).await?;
        let tokens = self.generate_tokens(user.id, &user.username, &user.role, &permissions)?;

        let mut conn = self.db.acquire().await?;
        self.store_refresh_token(&mut conn, user.id, &tokens.refresh_token).await?;
        drop(conn);

        let profile = self.me(user.id).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        let actor = Actor {
            user_id: Some(user.id),
            ..client.clone()
        };
        self.activity
            .record(
                &actor,
                EntityType::Session,
                "login",
                Some(user.id),
                &format!("{} logged in", user.username),
            )
            .await;

        Ok(LoginResponse {
            tokens,
            user: profile,
        })
    }

    /// Exchange a refresh token for a new token pair; the old one is revoked
    pub async fn refresh(&self, input: RefreshTokenInput) -> AppResult<AuthTokens> {
        input.validate()?;

        let token_hash = hash_token(&input.refresh_token);
        let mut tx = self.db.begin().await?;

        // Row lock makes concurrent reuse of one token fail for all but one caller
        let record = sqlx::query_as::<_, RefreshRow>(
            r#"
            SELECT rt.id, rt.user_id
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.status = 'active'
            FOR UPDATE OF rt
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized {
            message: "Invalid or expired refresh token".to_string(),
            message_id: "Refresh token tidak valid atau sudah kedaluwarsa".to_string(),
        })?;

        // Revoke old refresh token
        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE id = $1")
            .bind(record.id)
            .execute(&mut *tx)
            .await?;

        let (username, role) = sqlx::query_as::<_, (String, String)>(
            "SELECT u.username, r.code FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1",
        )
        .bind(record.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let permissions = self.user_permissions(record.user_id).await?;
        let tokens = self.generate_tokens(record.user_id, &username, &role, &permissions)?;

        self.store_refresh_token(&mut tx, record.user_id, &tokens.refresh_token).await?;
        tx.commit().await?;

        Ok(tokens)
    }

    /// Revoke one of the caller's refresh tokens
    pub async fn logout(&self, actor: &Actor, user_id: Uuid, input: RefreshTokenInput) -> AppResult<()> {
        input.validate()?;

        sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = NOW()
            WHERE token_hash = $1 AND user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(hash_token(&input.refresh_token))
        .bind(user_id)
        .execute(&self.db)
        .await?;

        self.activity
            .record(actor, EntityType::Session, "logout", Some(user_id), "Logged out")
            .await;

        Ok(())
    }

    /// Current user's profile with permissions
    pub async fn me(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let mut profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.username, u.email, u.full_name, r.code AS role, r.name AS role_name,
                   u.status, u.last_login_at
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        profile.permissions = self.user_permissions(user_id).await?;
        Ok(profile)
    }

    /// Get user permissions from database
    async fn user_permissions(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let permissions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT CONCAT(p.resource, ':', p.action)
            FROM users u
            JOIN role_permissions rp ON rp.role_id = u.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE u.id = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(
        &self,
        user_id: Uuid,
        username: &str,
        role: &str,
        permissions: &[String],
    ) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            permissions: permissions.to_vec(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            refresh_token: new_refresh_token(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token hash
    async fn store_refresh_token(&self, conn: &mut PgConnection, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// 244 random bits from two v4 UUIDs
fn new_refresh_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Refresh tokens are stored only as SHA-256 digests
fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_and_opaque() {
        let token = new_refresh_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        // 32-byte digest, unpadded base64
        assert_eq!(hash_token(&token).len(), 43);
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        assert_ne!(new_refresh_token(), new_refresh_token());
    }
}
