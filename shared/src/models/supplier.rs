//! Supplier models

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::RecordStatus;

/// Input for registering a supplier
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateSupplierInput {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Query filters for listing suppliers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierFilter {
    pub status: Option<RecordStatus>,
    /// Matches name, contact person, phone or email
    pub q: Option<String>,
}
