//! Material models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::RecordStatus;
use crate::validation::{material_code_rule, price_rule, stock_level_rule};

/// Unit of measure for a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "material_unit", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MaterialUnit {
    Pcs,
    Kg,
    Liter,
    Meter,
    Box,
    Pack,
}

impl MaterialUnit {
    pub const ALL: [MaterialUnit; 6] = [
        MaterialUnit::Pcs,
        MaterialUnit::Kg,
        MaterialUnit::Liter,
        MaterialUnit::Meter,
        MaterialUnit::Box,
        MaterialUnit::Pack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialUnit::Pcs => "pcs",
            MaterialUnit::Kg => "kg",
            MaterialUnit::Liter => "liter",
            MaterialUnit::Meter => "meter",
            MaterialUnit::Box => "box",
            MaterialUnit::Pack => "pack",
        }
    }
}

impl std::str::FromStr for MaterialUnit {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or("Unit must be one of pcs, kg, liter, meter, box, pack")
    }
}

/// Derived stock level indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Empty,
    Low,
    Warning,
    Normal,
}

impl StockStatus {
    /// Classify a stock level against its thresholds.
    ///
    /// Checks run from most to least severe, so a material at zero stock is
    /// `Empty` even when `min_stock` is also zero.
    pub fn classify(current_stock: Decimal, min_stock: Decimal, reorder_point: Decimal) -> Self {
        if current_stock <= Decimal::ZERO {
            StockStatus::Empty
        } else if current_stock <= min_stock {
            StockStatus::Low
        } else if current_stock <= reorder_point {
            StockStatus::Warning
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Empty => "empty",
            StockStatus::Low => "low",
            StockStatus::Warning => "warning",
            StockStatus::Normal => "normal",
        }
    }
}

/// Input for creating a material
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMaterialInput {
    #[validate(custom = "material_code_rule")]
    pub code: String,
    #[validate(length(min = 3, max = 100, message = "Name must be 3-100 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub default_supplier_id: Option<Uuid>,
    pub unit: MaterialUnit,
    #[validate(custom = "stock_level_rule")]
    pub min_stock: Option<Decimal>,
    /// Defaults to `min_stock`
    #[validate(custom = "stock_level_rule")]
    pub reorder_point: Option<Decimal>,
    #[validate(custom = "price_rule")]
    pub unit_price: Option<Decimal>,
    /// Recorded as a count-correction adjustment, never written directly
    #[validate(custom = "stock_level_rule")]
    pub opening_stock: Option<Decimal>,
}

impl CreateMaterialInput {
    /// Trim text and uppercase the code before validation
    pub fn normalized(mut self) -> Self {
        self.code = self.code.trim().to_uppercase();
        self.name = self.name.trim().to_string();
        self
    }
}

/// Input for updating a material; stock quantity is not editable here
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateMaterialInput {
    #[validate(length(min = 3, max = 100, message = "Name must be 3-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub default_supplier_id: Option<Uuid>,
    pub unit: Option<MaterialUnit>,
    #[validate(custom = "stock_level_rule")]
    pub min_stock: Option<Decimal>,
    #[validate(custom = "stock_level_rule")]
    pub reorder_point: Option<Decimal>,
    #[validate(custom = "price_rule")]
    pub unit_price: Option<Decimal>,
}

/// Query filters for listing materials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialFilter {
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub status: Option<RecordStatus>,
    pub stock_status: Option<StockStatus>,
    /// Matches code or name
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_classify_stock_status() {
        let min = dec("10");
        let reorder = dec("20");
        assert_eq!(StockStatus::classify(Decimal::ZERO, min, reorder), StockStatus::Empty);
        assert_eq!(StockStatus::classify(dec("10"), min, reorder), StockStatus::Low);
        assert_eq!(StockStatus::classify(dec("15"), min, reorder), StockStatus::Warning);
        assert_eq!(StockStatus::classify(dec("20.001"), min, reorder), StockStatus::Normal);
    }

    #[test]
    fn test_unit_round_trip() {
        for unit in MaterialUnit::ALL {
            assert_eq!(MaterialUnit::from_str(unit.as_str()), Ok(unit));
        }
        assert!(MaterialUnit::from_str("ton").is_err());
    }

    #[test]
    fn test_create_material_validation() {
        let input = CreateMaterialInput {
            code: " mat-01 ".to_string(),
            name: "Tepung Terigu".to_string(),
            description: None,
            category_id: None,
            default_supplier_id: None,
            unit: MaterialUnit::Kg,
            min_stock: Some(dec("5")),
            reorder_point: None,
            unit_price: Some(dec("-1")),
            opening_stock: None,
        }
        .normalized();

        assert_eq!(input.code, "MAT-01");
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("unit_price"));
        assert!(!fields.contains_key("code"));
    }
}
