//! Stock-in (goods receipt) models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{price_rule, quantity_rule, reference_number_rule};

/// Input for recording a receipt
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStockInInput {
    pub material_id: Uuid,
    pub supplier_id: Uuid,
    #[validate(custom = "quantity_rule")]
    pub quantity: Decimal,
    #[validate(custom = "price_rule")]
    pub unit_price: Decimal,
    /// Defaults to today; must not be in the future
    pub transaction_date: Option<NaiveDate>,
    /// Generated as `IN<YYYYMMDD><seq>` when omitted
    #[validate(custom = "reference_number_rule")]
    pub reference_number: Option<String>,
    #[validate(length(max = 50))]
    pub invoice_number: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Editable fields of a recorded receipt.
///
/// Quantity, price and material are fixed once stock has moved; unknown fields
/// are rejected so such edits fail loudly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateStockInInput {
    pub supplier_id: Option<Uuid>,
    pub transaction_date: Option<NaiveDate>,
    #[validate(length(max = 50))]
    pub invoice_number: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl UpdateStockInInput {
    pub fn is_empty(&self) -> bool {
        self.supplier_id.is_none()
            && self.transaction_date.is_none()
            && self.invoice_number.is_none()
            && self.notes.is_none()
    }
}

/// Query filters for listing receipts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockInFilter {
    pub material_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches reference or invoice number
    pub q: Option<String>,
}
