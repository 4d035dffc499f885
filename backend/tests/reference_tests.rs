//! Reference number and request validation tests

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    next_reference, parse_sequence, validate_reference_number, CreateMaterialInput,
    CreateStockInInput, CreateStockOutInput, MaterialUnit, ReferencePrefix,
};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| day(y, m, d))
}

fn prefix_strategy() -> impl Strategy<Value = ReferencePrefix> {
    prop_oneof![Just(ReferencePrefix::StockIn), Just(ReferencePrefix::StockOut)]
}

proptest! {
    /// Generated references are accepted by the client-side reference rule
    #[test]
    fn test_generated_reference_is_valid(
        prefix in prefix_strategy(),
        date in date_strategy(),
        last in 0u64..100_000,
    ) {
        let previous = if last == 0 {
            None
        } else {
            Some(format!("{}{:04}", prefix.day_prefix(date), last))
        };
        let next = next_reference(prefix, date, previous.as_deref()).unwrap();

        prop_assert!(validate_reference_number(&next).is_ok());
        prop_assert_eq!(parse_sequence(&prefix.day_prefix(date), &next), Some(last + 1));
    }

    /// Sequences never repeat within a day
    #[test]
    fn test_sequence_strictly_increases(
        prefix in prefix_strategy(),
        date in date_strategy(),
        steps in 1usize..30,
    ) {
        let day_prefix = prefix.day_prefix(date);
        let mut last: Option<String> = None;
        let mut previous_seq = 0;

        for _ in 0..steps {
            let next = next_reference(prefix, date, last.as_deref()).unwrap();
            let seq = parse_sequence(&day_prefix, &next).unwrap();
            prop_assert!(seq > previous_seq);
            previous_seq = seq;
            last = Some(next);
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        assert_eq!(
            next_reference(ReferencePrefix::StockIn, day(2024, 1, 15), None).unwrap(),
            "IN202401150001"
        );
        assert_eq!(
            next_reference(
                ReferencePrefix::StockOut,
                day(2024, 1, 15),
                Some("OUT202401150041")
            )
            .unwrap(),
            "OUT202401150042"
        );
    }

    #[test]
    fn test_reference_day_boundary_resets() {
        // The last reference belongs to the previous day
        assert_eq!(
            next_reference(
                ReferencePrefix::StockIn,
                day(2024, 1, 16),
                Some("IN202401150099")
            )
            .unwrap(),
            "IN202401160001"
        );
    }

    #[test]
    fn test_lowercase_reference_rejected() {
        assert!(validate_reference_number("in-2024-001").is_err());
        assert!(validate_reference_number("PO-2024-001").is_ok());
    }

    fn receipt(quantity: &str, unit_price: &str, reference: Option<&str>) -> CreateStockInInput {
        CreateStockInInput {
            material_id: Uuid::new_v4(),
            supplier_id: Uuid::new_v4(),
            quantity: Decimal::from_str(quantity).unwrap(),
            unit_price: Decimal::from_str(unit_price).unwrap(),
            transaction_date: None,
            reference_number: reference.map(str::to_string),
            invoice_number: None,
            notes: None,
        }
    }

    #[test]
    fn test_oversized_receipt_fails_validation() {
        let errors = receipt("100000000000000000000", "10000000000", None)
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(!fields.contains_key("unit_price"));

        let errors = receipt("1", "10000000000000", None).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("unit_price"));
    }

    #[test]
    fn test_excess_decimal_places_fail_validation() {
        let errors = receipt("0.0004", "1000", None).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity"));

        let errors = receipt("1.0006", "1000", None).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity"));

        let errors = receipt("1", "10.005", None).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("unit_price"));

        assert!(receipt("1.250", "10.50", None).validate().is_ok());
    }

    /// Hand-entered references cannot occupy the generated sequence
    #[test]
    fn test_supplied_reference_in_generated_form_rejected() {
        for reference in ["IN202401154294967295", "IN2024011599999999999", "OUT202401150001"] {
            let errors = receipt("1", "1000", Some(reference)).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("reference_number"), "{}", reference);
        }
        assert!(receipt("1", "1000", Some("PO-2024-77")).validate().is_ok());
    }

    #[test]
    fn test_large_same_day_sequence_keeps_increasing() {
        let next = next_reference(
            ReferencePrefix::StockIn,
            day(2024, 1, 15),
            Some("IN202401154294967295"),
        )
        .unwrap();
        assert_eq!(next, "IN202401154294967296");
        assert!(next_reference(
            ReferencePrefix::StockIn,
            day(2024, 1, 15),
            Some("IN20240115999999999999999999999"),
        )
        .is_err());
    }

    #[test]
    fn test_stock_out_requires_positive_quantity_and_usage() {
        let input = CreateStockOutInput {
            material_id: Uuid::new_v4(),
            quantity: Decimal::ZERO,
            usage_type: String::new(),
            destination: None,
            transaction_date: None,
            reference_number: None,
            notes: None,
        };

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("usage_type"));
    }

    #[test]
    fn test_material_code_normalized_before_validation() {
        let input = CreateMaterialInput {
            code: "  rm-001 ".to_string(),
            name: "Steel Sheet".to_string(),
            description: None,
            category_id: None,
            default_supplier_id: None,
            unit: MaterialUnit::Pcs,
            min_stock: None,
            reorder_point: None,
            unit_price: None,
            opening_stock: None,
        }
        .normalized();

        assert_eq!(input.code, "RM-001");
        assert!(input.validate().is_ok());
    }
}
