//! WebAssembly module for the Warehouse Inventory Platform
//!
//! Lets browser forms run the same rules as the server before submitting:
//! - Stock previews for receipts, issues and adjustments
//! - Stock status classification
//! - Reference number and material code checks
//!
//! Quantities cross the boundary as decimal strings, matching the API.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::{
    next_reference, AdjustmentReason, MaterialUnit, ReferencePrefix, StockChange, StockError,
    StockMutation, StockStatus,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("warehouse-inventory-wasm loaded"));
}

/// Outcome of a stock preview, serialized to JSON for the form
#[derive(Debug, Serialize)]
struct Preview {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    change: Option<StockChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(value.trim())
        .map_err(|_| JsValue::from_str(&format!("{} is not a valid number", field)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn preview(mutation: StockMutation, current: Decimal) -> Preview {
    match mutation.apply(current) {
        Ok(change) => Preview {
            ok: true,
            change: Some(change),
            error: None,
        },
        Err(err) => Preview {
            ok: false,
            change: None,
            error: Some(preview_message(&err)),
        },
    }
}

fn preview_message(err: &StockError) -> String {
    match err {
        StockError::InsufficientStock { available, .. } => {
            format!("Insufficient stock. Available: {}", available)
        }
        other => other.to_string(),
    }
}

fn stock_preview(mutation: fn(Decimal) -> StockMutation, current: &str, quantity: &str) -> Result<String, JsValue> {
    let current = parse_decimal("current_stock", current)?;
    let quantity = parse_decimal("quantity", quantity)?;
    to_json(&preview(mutation(quantity), current))
}

/// Stock after receiving `quantity`
#[wasm_bindgen]
pub fn preview_stock_in(current_stock: &str, quantity: &str) -> Result<String, JsValue> {
    stock_preview(StockMutation::Receive, current_stock, quantity)
}

/// Stock after issuing `quantity`; `ok` is false when it would go negative
#[wasm_bindgen]
pub fn preview_stock_out(current_stock: &str, quantity: &str) -> Result<String, JsValue> {
    stock_preview(StockMutation::Issue, current_stock, quantity)
}

/// Signed difference a count of `new_stock` would record
#[wasm_bindgen]
pub fn preview_adjustment(current_stock: &str, new_stock: &str) -> Result<String, JsValue> {
    stock_preview(StockMutation::Set, current_stock, new_stock)
}

/// `empty`, `low`, `warning` or `normal`
#[wasm_bindgen]
pub fn classify_stock_status(current_stock: &str, min_stock: &str, reorder_point: &str) -> Result<String, JsValue> {
    let status = StockStatus::classify(
        parse_decimal("current_stock", current_stock)?,
        parse_decimal("min_stock", min_stock)?,
        parse_decimal("reorder_point", reorder_point)?,
    );
    Ok(status.as_str().to_string())
}

/// Empty string when a hand-entered reference is acceptable, otherwise the error message
#[wasm_bindgen]
pub fn validate_reference_number(reference: &str) -> String {
    shared::validate_supplied_reference(reference)
        .err()
        .unwrap_or_default()
        .to_string()
}

/// Empty string when valid, otherwise the error message
#[wasm_bindgen]
pub fn validate_material_code(code: &str) -> String {
    shared::validate_material_code(code)
        .err()
        .unwrap_or_default()
        .to_string()
}

/// Reference the server would generate after `last_same_day` (empty for none).
///
/// `kind` is `IN` or `OUT`, `date` is `YYYY-MM-DD`. The server assigns the
/// final number, so this is only a hint for the form.
#[wasm_bindgen]
pub fn next_reference_number(kind: &str, date: &str, last_same_day: &str) -> Result<String, JsValue> {
    let prefix = ReferencePrefix::from_str(kind).map_err(JsValue::from_str)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| JsValue::from_str("date must be YYYY-MM-DD"))?;
    let last = Some(last_same_day.trim()).filter(|s| !s.is_empty());
    next_reference(prefix, date, last).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[derive(Serialize)]
struct Choice {
    value: &'static str,
    label: &'static str,
}

/// Adjustment reasons as `[{value, label}]` JSON
#[wasm_bindgen]
pub fn adjustment_reasons() -> Result<String, JsValue> {
    let choices: Vec<Choice> = AdjustmentReason::ALL
        .iter()
        .map(|reason| Choice {
            value: reason.as_str(),
            label: reason.label_id(),
        })
        .collect();
    to_json(&choices)
}

/// Units of measure as a JSON array of strings
#[wasm_bindgen]
pub fn material_units() -> Result<String, JsValue> {
    let units: Vec<&str> = MaterialUnit::ALL.iter().map(MaterialUnit::as_str).collect();
    to_json(&units)
}

/// Today's date in the browser's local time, `YYYY-MM-DD`
#[wasm_bindgen]
pub fn local_today() -> String {
    let now = js_sys::Date::new_0();
    format!(
        "{:04}-{:02}-{:02}",
        now.get_full_year(),
        now.get_month() + 1,
        now.get_date()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_stock_out_rejects_overdraw() {
        let json = preview_stock_out("10", "15").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"], "Insufficient stock. Available: 10");
    }

    #[test]
    fn test_preview_adjustment_difference() {
        let json = preview_adjustment("40", "35").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["change"]["difference"], "-5");
    }

    #[test]
    fn test_classify_stock_status() {
        assert_eq!(classify_stock_status("0", "0", "0").unwrap(), "empty");
        assert_eq!(classify_stock_status("5", "10", "20").unwrap(), "low");
        assert_eq!(classify_stock_status("15", "10", "20").unwrap(), "warning");
        assert_eq!(classify_stock_status("25", "10", "20").unwrap(), "normal");
    }

    #[test]
    fn test_next_reference_number() {
        assert_eq!(
            next_reference_number("IN", "2024-01-15", "").unwrap(),
            "IN202401150001"
        );
        assert_eq!(
            next_reference_number("OUT", "2024-01-15", "OUT202401150009").unwrap(),
            "OUT202401150010"
        );
    }

    #[test]
    fn test_material_units_lists_all() {
        let units: Vec<String> = serde_json::from_str(&material_units().unwrap()).unwrap();
        assert_eq!(units.len(), 6);
        assert!(units.contains(&"kg".to_string()));
    }
}
