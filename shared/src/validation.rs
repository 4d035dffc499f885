//! Validation utilities for the Warehouse Inventory Platform
//!
//! Plain checks return `Result<(), &'static str>`; the `*_rule` adapters wrap
//! them for `#[validate(custom = "...")]` on request structs.

use std::borrow::Cow;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::reference::{is_generated_reference, MAX_REFERENCE_LEN};
use crate::stock::{MAX_QUANTITY, MAX_UNIT_PRICE, PRICE_SCALE, QUANTITY_SCALE};

// ============================================================================
// Stock Transaction Validations
// ============================================================================

/// Decimal places after dropping trailing zeros, so `1.000` counts as 0
fn significant_scale(value: Decimal) -> u32 {
    value.normalize().scale()
}

/// Validate a transaction quantity (positive, fits NUMERIC(15, 3))
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    validate_stock_level(quantity)
}

/// Validate a counted or threshold stock level (zero allowed, fits NUMERIC(15, 3))
pub fn validate_stock_level(value: Decimal) -> Result<(), &'static str> {
    validate_non_negative(value)?;
    if value > MAX_QUANTITY {
        return Err("Quantity must be at most 999999999999.999");
    }
    if significant_scale(value) > QUANTITY_SCALE {
        return Err("Quantity may have at most 3 decimal places");
    }
    Ok(())
}

/// Validate a unit price (zero allowed, fits NUMERIC(15, 2))
pub fn validate_price(value: Decimal) -> Result<(), &'static str> {
    validate_non_negative(value)?;
    if value > MAX_UNIT_PRICE {
        return Err("Price must be at most 9999999999999.99");
    }
    if significant_scale(value) > PRICE_SCALE {
        return Err("Price may have at most 2 decimal places");
    }
    Ok(())
}

/// Validate a value that may be zero but not negative
pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    Ok(())
}

/// Validate that a transaction date is not in the future
pub fn validate_transaction_date(date: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    if date > today {
        return Err("Transaction date cannot be in the future");
    }
    Ok(())
}

/// Validate a reference number (uppercase letters, digits and dashes)
pub fn validate_reference_number(reference: &str) -> Result<(), &'static str> {
    if reference.is_empty() {
        return Err("Reference number cannot be empty");
    }
    if reference.len() > MAX_REFERENCE_LEN {
        return Err("Reference number must be at most 50 characters");
    }
    if !reference
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Reference number may only contain A-Z, 0-9 and '-'");
    }
    Ok(())
}

/// Validate a client-supplied reference number.
///
/// `IN`/`OUT` followed by digits only is the generated form and stays reserved
/// for the per-day sequence.
pub fn validate_supplied_reference(reference: &str) -> Result<(), &'static str> {
    validate_reference_number(reference)?;
    if is_generated_reference(reference) {
        return Err("Reference numbers like IN<YYYYMMDD><sequence> are assigned automatically");
    }
    Ok(())
}

/// Validate a reporting year
pub fn validate_report_year(year: i32) -> Result<(), &'static str> {
    if !(2000..=2100).contains(&year) {
        return Err("Year must be between 2000 and 2100");
    }
    Ok(())
}

// ============================================================================
// Master Data Validations
// ============================================================================

/// Validate material code format (2-20 chars of A-Z, 0-9 or '-')
pub fn validate_material_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Material code must be at least 2 characters");
    }
    if code.len() > 20 {
        return Err("Material code must be at most 20 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Material code may only contain A-Z, 0-9 and '-'");
    }
    Ok(())
}

/// Check that reorder point is not below the minimum stock level
pub fn validate_stock_thresholds(min_stock: Decimal, reorder_point: Decimal) -> Result<(), &'static str> {
    validate_non_negative(min_stock)?;
    if reorder_point < min_stock {
        return Err("Reorder point cannot be lower than minimum stock");
    }
    Ok(())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && email.len() >= 5 => {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

/// Validate username (3-50 chars, lowercase letters, digits, '.', '_' or '-')
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 || username.len() > 50 {
        return Err("Username must be 3-50 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err("Username may only contain a-z, 0-9, '.', '_' and '-'");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

// ============================================================================
// Validator Adapters
// ============================================================================

fn rule(code: &'static str, check: Result<(), &'static str>) -> Result<(), ValidationError> {
    check.map_err(|message| {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Borrowed(message));
        error
    })
}

pub fn quantity_rule(value: &Decimal) -> Result<(), ValidationError> {
    rule("quantity", validate_quantity(*value))
}

pub fn stock_level_rule(value: &Decimal) -> Result<(), ValidationError> {
    rule("stock_level", validate_stock_level(*value))
}

pub fn price_rule(value: &Decimal) -> Result<(), ValidationError> {
    rule("price", validate_price(*value))
}

pub fn reference_number_rule(value: &str) -> Result<(), ValidationError> {
    rule("reference_number", validate_supplied_reference(value))
}

pub fn material_code_rule(value: &str) -> Result<(), ValidationError> {
    rule("material_code", validate_material_code(value))
}

pub fn username_rule(value: &str) -> Result<(), ValidationError> {
    rule("username", validate_username(value))
}

pub fn password_rule(value: &str) -> Result<(), ValidationError> {
    rule("password", validate_password(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Stock Transaction Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(dec("0.001")).is_ok());
        assert!(validate_quantity(Decimal::ZERO).is_err());
        assert!(validate_quantity(dec("-3")).is_err());
    }

    #[test]
    fn test_validate_quantity_limits() {
        assert!(validate_quantity(dec("999999999999.999")).is_ok());
        assert!(validate_quantity(dec("1000000000000")).is_err());
        assert!(validate_quantity(dec("100000000000000000000")).is_err());
        assert!(validate_quantity(Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_quantity_scale() {
        assert!(validate_quantity(dec("1.005")).is_ok());
        assert!(validate_quantity(dec("2.5000")).is_ok());
        assert_eq!(
            validate_quantity(dec("0.0004")),
            Err("Quantity may have at most 3 decimal places")
        );
        assert!(validate_quantity(dec("1.0006")).is_err());
        assert!(validate_stock_level(dec("35.0001")).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(dec("1500.50")).is_ok());
        assert!(validate_price(dec("9999999999999.99")).is_ok());
        assert!(validate_price(dec("10000000000")).is_ok());
        assert!(validate_price(dec("10000000000000")).is_err());
        assert!(validate_price(dec("0.125")).is_err());
        assert!(validate_price(dec("-0.01")).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(Decimal::ZERO).is_ok());
        assert!(validate_non_negative(dec("-0.01")).is_err());
    }

    #[test]
    fn test_validate_transaction_date() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(validate_transaction_date(today, today).is_ok());
        assert!(validate_transaction_date(today.pred_opt().unwrap(), today).is_ok());
        assert!(validate_transaction_date(today.succ_opt().unwrap(), today).is_err());
    }

    #[test]
    fn test_validate_reference_number_valid() {
        assert!(validate_reference_number("IN202401150001").is_ok());
        assert!(validate_reference_number("PO-2024-77").is_ok());
    }

    #[test]
    fn test_validate_reference_number_invalid() {
        assert!(validate_reference_number("").is_err());
        assert!(validate_reference_number("in-lowercase").is_err());
        assert!(validate_reference_number("IN 2024").is_err());
        assert!(validate_reference_number(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_supplied_reference_cannot_take_generated_form() {
        assert!(validate_supplied_reference("PO-2024-77").is_ok());
        assert!(validate_supplied_reference("INV-20240115").is_ok());
        assert!(validate_supplied_reference("IN2024").is_ok());
        assert!(validate_supplied_reference("IN202401154294967295").is_err());
        assert!(validate_supplied_reference("IN2024011599999999999").is_err());
        assert!(validate_supplied_reference("OUT202401150001").is_err());
    }

    #[test]
    fn test_validate_report_year() {
        assert!(validate_report_year(2024).is_ok());
        assert!(validate_report_year(1999).is_err());
        assert!(validate_report_year(2101).is_err());
    }

    // ========================================================================
    // Master Data Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_material_code() {
        assert!(validate_material_code("MAT-001").is_ok());
        assert!(validate_material_code("A").is_err());
        assert!(validate_material_code("mat-001").is_err());
        assert!(validate_material_code("ABCDEFGHIJKLMNOPQRSTU").is_err());
    }

    #[test]
    fn test_validate_stock_thresholds() {
        assert!(validate_stock_thresholds(dec("10"), dec("15")).is_ok());
        assert!(validate_stock_thresholds(dec("10"), dec("10")).is_ok());
        assert!(validate_stock_thresholds(dec("10"), dec("5")).is_err());
        assert!(validate_stock_thresholds(dec("-1"), dec("5")).is_err());
    }

    // ========================================================================
    // Account Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_email() {
        assert!(validate_email("staff@gudang.co.id").is_ok());
        assert!(validate_email("@gudang.co.id").is_err());
        assert!(validate_email("staff.gudang").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("budi.s").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Budi").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("rahasia123").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_rule_adapter_carries_message() {
        let err = quantity_rule(&Decimal::ZERO).unwrap_err();
        assert_eq!(err.code, "quantity");
        assert_eq!(err.message.as_deref(), Some("Quantity must be greater than zero"));
    }
}
