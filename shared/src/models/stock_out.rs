//! Stock-out (consumption) models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{quantity_rule, reference_number_rule};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStockOutInput {
    pub material_id: Uuid,
    #[validate(custom = "quantity_rule")]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 50, message = "Usage type is required (max 50 characters)"))]
    pub usage_type: String,
    #[validate(length(max = 255))]
    pub destination: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    #[validate(custom = "reference_number_rule")]
    pub reference_number: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockOutFilter {
    pub material_id: Option<Uuid>,
    pub usage_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches reference number, destination or notes
    pub q: Option<String>,
}
