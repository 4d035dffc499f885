//! Error handling for the Warehouse Inventory Platform
//!
//! Provides consistent error envelopes in English and Indonesian

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{reference::ReferenceError, stock::StockError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_id: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_id: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_id: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule errors
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Business rule violated ({code}): {message}")]
    BusinessRule {
        code: &'static str,
        message: String,
        message_id: String,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: &str, message_id: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_id: message_id.to_string(),
        }
    }

    pub fn business_rule(code: &'static str, message: impl Into<String>, message_id: impl Into<String>) -> Self {
        AppError::BusinessRule {
            code,
            message: message.into(),
            message_id: message_id.into(),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NonPositiveQuantity => AppError::validation(
                "quantity",
                "Quantity must be greater than zero",
                "Jumlah harus lebih dari nol",
            ),
            StockError::NegativeTarget => AppError::validation(
                "new_stock",
                "Stock level cannot be negative",
                "Stok tidak boleh negatif",
            ),
            StockError::InsufficientStock {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            StockError::StockLimitExceeded => stock_limit_exceeded(),
            StockError::TotalPriceTooLarge => AppError::validation(
                "unit_price",
                "Total price exceeds the maximum of 9999999999999999.99",
                "Total harga melebihi batas maksimum 9999999999999999.99",
            ),
        }
    }
}

fn rejection(default_field: &str, detail: String, message_id: &str) -> AppError {
    let field = crate::extract::rejected_field(&detail)
        .unwrap_or(default_field)
        .to_string();
    AppError::Validation {
        field,
        message: detail,
        message_id: message_id.to_string(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        rejection("body", err.body_text(), "Isi permintaan tidak valid")
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        rejection("query", err.body_text(), "Parameter kueri tidak valid")
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        rejection("path", err.body_text(), "Parameter path tidak valid")
    }
}

impl From<ReferenceError> for AppError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::SequenceExhausted(day_prefix) => AppError::Conflict {
                resource: "reference_number".to_string(),
                message: format!("No reference numbers left for {}", day_prefix),
                message_id: format!("Nomor referensi untuk {} sudah habis", day_prefix),
            },
        }
    }
}

fn stock_limit_exceeded() -> AppError {
    AppError::business_rule(
        "STOCK_LIMIT_EXCEEDED",
        "Stock level would exceed the maximum of 999999999999.999",
        "Stok akan melebihi batas maksimum 999999999999.999",
    )
}

/// SQLSTATE for numeric_value_out_of_range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Translate constraint violations into client errors; anything else stays a 500
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();

            if db_err.is_unique_violation() {
                return AppError::DuplicateEntry(duplicate_field(&constraint).to_string());
            }

            if db_err.is_check_violation() {
                return check_violation(&constraint);
            }

            if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
                return stock_limit_exceeded();
            }

            if db_err.is_foreign_key_violation() {
                return AppError::Conflict {
                    resource: constraint,
                    message: "Referenced record does not exist or is still in use".to_string(),
                    message_id: "Data terkait tidak ada atau masih digunakan".to_string(),
                };
            }
        }

        AppError::DatabaseError(err)
    }
}

/// Map a CHECK constraint to the rule the client broke
fn check_violation(constraint: &str) -> AppError {
    match constraint {
        "materials_current_stock_non_negative" => AppError::business_rule(
            "INSUFFICIENT_STOCK",
            "Operation would make stock negative",
            "Operasi akan membuat stok menjadi negatif",
        ),
        "stock_in_quantity_positive" | "stock_out_quantity_positive" => AppError::validation(
            "quantity",
            "Quantity must be greater than zero",
            "Jumlah harus lebih dari nol",
        ),
        "stock_in_unit_price_non_negative" | "materials_unit_price_non_negative" => {
            AppError::validation("unit_price", "Value cannot be negative", "Nilai tidak boleh negatif")
        }
        "materials_thresholds_non_negative" => {
            AppError::validation("min_stock", "Value cannot be negative", "Nilai tidak boleh negatif")
        }
        "stock_adjustments_levels_non_negative" => AppError::validation(
            "new_stock",
            "Stock level cannot be negative",
            "Stok tidak boleh negatif",
        ),
        other => AppError::business_rule(
            "CONSTRAINT_VIOLATION",
            format!("Value rejected by {}", other),
            format!("Nilai ditolak oleh {}", other),
        ),
    }
}

/// Map a unique constraint name to the field clients know it by
fn duplicate_field(constraint: &str) -> &str {
    match constraint {
        "stock_in_reference_number_key" | "stock_out_reference_number_key" => "reference_number",
        "materials_code_key" => "code",
        "categories_name_key" => "name",
        "users_username_key" => "username",
        "users_email_key" => "email",
        "" => "record",
        other => other,
    }
}

/// Error envelope
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: ErrorDetail,
    /// Field-level messages for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    /// Indonesian message
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(detail: ErrorDetail) -> Self {
        Self {
            success: false,
            message: detail.message_en.clone(),
            error: detail,
            errors: None,
        }
    }
}

/// First message per field, keyed by field name
fn field_messages(errors: &validator::ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                (field.to_string(), message)
            })
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut errors = None;

        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message_en: "Invalid username or password".to_string(),
                    message_id: "Username atau password salah".to_string(),
                    field: None,
                },
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_id: "Token sudah kedaluwarsa".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_id: "Token tidak valid".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_id: "Anda tidak memiliki izin untuk melakukan tindakan ini".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized { message, message_id } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_id: message_id.clone(),
                    field: None,
                },
            ),
            AppError::Validation { field, message, message_id } => {
                errors = Some(BTreeMap::from([(field.clone(), message.clone())]));
                (
                    StatusCode::BAD_REQUEST,
                    ErrorDetail {
                        code: "VALIDATION_ERROR".to_string(),
                        message_en: message.clone(),
                        message_id: message_id.clone(),
                        field: Some(field.clone()),
                    },
                )
            }
            AppError::InvalidInput(validation_errors) => {
                let messages = field_messages(validation_errors);
                let field = messages.keys().next().cloned();
                errors = Some(messages);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorDetail {
                        code: "VALIDATION_ERROR".to_string(),
                        message_en: "Validation failed".to_string(),
                        message_id: "Validasi gagal".to_string(),
                        field,
                    },
                )
            }
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message_en: format!("A record with this {} already exists", field),
                    message_id: format!("Data dengan {} ini sudah ada", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict { resource, message, message_id } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_id: message_id.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_id: format!("{} tidak ditemukan", resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock { available, requested } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: format!(
                        "Insufficient stock: available {}, requested {}",
                        available, requested
                    ),
                    message_id: format!(
                        "Stok tidak mencukupi: tersedia {}, diminta {}",
                        available, requested
                    ),
                    field: Some("quantity".to_string()),
                },
            ),
            AppError::BusinessRule { code, message, message_id } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: code.to_string(),
                    message_en: message.clone(),
                    message_id: message_id.clone(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_id: "Terjadi kesalahan pada database".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_id: "Terjadi kesalahan internal pada server".to_string(),
                    field: None,
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let mut body = ErrorResponse::new(error_detail);
        body.errors = errors;

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_stock_error_mapping() {
        let err: AppError = StockError::InsufficientStock {
            available: Decimal::from(10),
            requested: Decimal::from(15),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: AppError = StockError::NonPositiveQuantity.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_errors_become_field_map() {
        let input = shared::CreateCategoryInput {
            name: "A".to_string(),
            description: None,
        };
        let err = AppError::from(input.validate().unwrap_err());
        if let AppError::InvalidInput(ref errors) = err {
            let messages = field_messages(errors);
            assert_eq!(
                messages.get("name").map(String::as_str),
                Some("Name must be 2-50 characters")
            );
        } else {
            panic!("expected InvalidInput");
        }
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_check_violations_are_client_errors() {
        let quantity = check_violation("stock_out_quantity_positive");
        assert!(matches!(quantity, AppError::Validation { ref field, .. } if field == "quantity"));
        assert_eq!(quantity.into_response().status(), StatusCode::BAD_REQUEST);

        let negative = check_violation("materials_current_stock_non_negative");
        assert_eq!(negative.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unknown = check_violation("stock_adjustments_difference_consistent");
        assert!(unknown.into_response().status().is_client_error());
    }

    #[test]
    fn test_overflow_errors_are_client_errors() {
        let err: AppError = StockError::StockLimitExceeded.into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: AppError = StockError::TotalPriceTooLarge.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_field_names() {
        assert_eq!(duplicate_field("stock_in_reference_number_key"), "reference_number");
        assert_eq!(duplicate_field("materials_code_key"), "code");
        assert_eq!(duplicate_field(""), "record");
    }
}
