//! Stock adjustment (reconciliation) models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::stock_level_rule;

/// Why a counted stock level differs from the recorded one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "adjustment_reason", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    CountCorrection,
    Damage,
    Expiry,
    Theft,
    SystemError,
    Other,
}

impl AdjustmentReason {
    pub const ALL: [AdjustmentReason; 6] = [
        AdjustmentReason::CountCorrection,
        AdjustmentReason::Damage,
        AdjustmentReason::Expiry,
        AdjustmentReason::Theft,
        AdjustmentReason::SystemError,
        AdjustmentReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::CountCorrection => "count_correction",
            AdjustmentReason::Damage => "damage",
            AdjustmentReason::Expiry => "expiry",
            AdjustmentReason::Theft => "theft",
            AdjustmentReason::SystemError => "system_error",
            AdjustmentReason::Other => "other",
        }
    }

    /// Indonesian label shown in the warehouse UI
    pub fn label_id(&self) -> &'static str {
        match self {
            AdjustmentReason::CountCorrection => "Koreksi Hitung",
            AdjustmentReason::Damage => "Rusak",
            AdjustmentReason::Expiry => "Kedaluwarsa",
            AdjustmentReason::Theft => "Hilang/Dicuri",
            AdjustmentReason::SystemError => "Kesalahan Sistem",
            AdjustmentReason::Other => "Lainnya",
        }
    }
}

impl std::str::FromStr for AdjustmentReason {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdjustmentReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or("Unknown adjustment reason")
    }
}

/// Input for reconciling a material's stock to a counted value
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAdjustmentInput {
    pub material_id: Uuid,
    #[validate(custom = "stock_level_rule")]
    pub new_stock: Decimal,
    pub reason: AdjustmentReason,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdjustmentFilter {
    pub material_id: Option<Uuid>,
    pub reason: Option<AdjustmentReason>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches notes or the creator's name
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_reason_parsing() {
        assert_eq!(AdjustmentReason::from_str("damage"), Ok(AdjustmentReason::Damage));
        assert_eq!(
            AdjustmentReason::from_str("system_error"),
            Ok(AdjustmentReason::SystemError)
        );
        assert!(AdjustmentReason::from_str("lost").is_err());
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&AdjustmentReason::CountCorrection).unwrap();
        assert_eq!(json, "\"count_correction\"");
    }
}
