//! User, role and session models

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::RecordStatus;
use crate::validation::{password_rule, username_rule};

/// Built-in roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleCode {
    Admin,
    Manager,
    Staff,
}

impl RoleCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleCode::Admin => "admin",
            RoleCode::Manager => "manager",
            RoleCode::Staff => "staff",
        }
    }
}

impl std::str::FromStr for RoleCode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(RoleCode::Admin),
            "manager" => Ok(RoleCode::Manager),
            "staff" => Ok(RoleCode::Staff),
            _ => Err("Role must be one of admin, manager, staff"),
        }
    }
}

/// Credentials for login; `login` accepts a username or an email
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub login: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RefreshTokenInput {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(custom = "username_rule")]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    pub full_name: String,
    #[validate(custom = "password_rule")]
    pub password: String,
    pub role: RoleCode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    pub full_name: Option<String>,
    pub role: Option<RoleCode>,
    #[validate(custom = "password_rule")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    pub status: Option<RecordStatus>,
    pub role: Option<RoleCode>,
    /// Matches username, email or full name
    pub q: Option<String>,
}

/// Replacement permission set for a role
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateRolePermissionsInput {
    pub permission_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_code_parsing() {
        assert_eq!(RoleCode::from_str("manager"), Ok(RoleCode::Manager));
        assert!(RoleCode::from_str("owner").is_err());
    }

    #[test]
    fn test_create_user_validation() {
        let input = CreateUserInput {
            username: "Budi".to_string(),
            email: "budi@gudang.id".to_string(),
            full_name: "Budi Santoso".to_string(),
            password: "short".to_string(),
            role: RoleCode::Staff,
        };

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("email"));
    }
}
