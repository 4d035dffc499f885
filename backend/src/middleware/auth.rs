//! Authentication middleware
//!
//! JWT authentication and permission checks. The authenticated user is placed
//! in request extensions by `auth_middleware` and handed to handlers through
//! the `CurrentUser` and `RequestContext` extractors.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::RoleCode;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: RoleCode,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = format!("{}:{}", resource, action);
        self.permissions.contains(&permission)
    }

    /// Fail with 403 unless the permission is granted
    pub fn require(&self, resource: &str, action: &str) -> Result<(), AppError> {
        if self.has_permission(resource, action) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                "Permission denied: requires {}:{}",
                resource,
                action
            );
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication middleware that validates JWT tokens with the configured secret
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized {
                message: "Missing or invalid Authorization header".to_string(),
                message_id: "Header Authorization tidak ada atau tidak valid".to_string(),
            }
            .into_response();
        }
    };

    let auth_user = match decode_jwt(token, &state.config.jwt.secret).and_then(auth_user_from_claims) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Decode and validate JWT token
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

fn auth_user_from_claims(claims: Claims) -> Result<AuthUser, AppError> {
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
    let role = claims
        .role
        .parse::<RoleCode>()
        .map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser {
        user_id,
        username: claims.username,
        role,
        permissions: claims.permissions,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_id: "Silakan login terlebih dahulu".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn user(perms: &[&str]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            username: "sari".to_string(),
            role: RoleCode::Staff,
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_has_permission() {
        let staff = user(&["stock_in:create", "material:view"]);
        assert!(staff.has_permission("stock_in", "create"));
        assert!(!staff.has_permission("stock_adjustment", "create"));
        assert!(staff.require("stock_adjustment", "create").is_err());
    }

    #[test]
    fn test_decode_round_trip_and_expiry() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "sari".to_string(),
            role: "manager".to_string(),
            permissions: vec!["stock_adjustment:create".to_string()],
            exp: now + 60,
            iat: now,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s3cret")).unwrap();

        let user = decode_jwt(&token, "s3cret").and_then(auth_user_from_claims).unwrap();
        assert_eq!(user.role, RoleCode::Manager);
        assert!(matches!(decode_jwt(&token, "other"), Err(AppError::InvalidToken)));

        let expired = Claims { exp: now - 3600, iat: now - 7200, ..claims };
        let token = encode(&Header::default(), &expired, &EncodingKey::from_secret(b"s3cret")).unwrap();
        assert!(matches!(decode_jwt(&token, "s3cret"), Err(AppError::TokenExpired)));
    }
}
