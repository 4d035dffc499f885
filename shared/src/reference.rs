//! Transaction reference numbers
//!
//! Generated references look like `IN202401150001`: a prefix, the transaction
//! day as `YYYYMMDD` and a zero-padded per-day sequence.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum width of the per-day sequence
pub const SEQUENCE_WIDTH: usize = 4;

/// Longest reference number accepted from clients
pub const MAX_REFERENCE_LEN: usize = 50;

/// Digits in the `YYYYMMDD` part
const DATE_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Reference sequence for {0} is exhausted")]
    SequenceExhausted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePrefix {
    StockIn,
    StockOut,
}

impl ReferencePrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferencePrefix::StockIn => "IN",
            ReferencePrefix::StockOut => "OUT",
        }
    }

    /// Prefix shared by every reference generated on `date`
    pub fn day_prefix(&self, date: NaiveDate) -> String {
        format!("{}{}", self.as_str(), date.format("%Y%m%d"))
    }

    pub const ALL: [ReferencePrefix; 2] = [ReferencePrefix::StockIn, ReferencePrefix::StockOut];
}

impl std::str::FromStr for ReferencePrefix {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" | "in" | "stock_in" => Ok(ReferencePrefix::StockIn),
            "OUT" | "out" | "stock_out" => Ok(ReferencePrefix::StockOut),
            _ => Err("Unknown reference prefix"),
        }
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `reference` has the generated shape `<IN|OUT><YYYYMMDD><digits>`
pub fn is_generated_reference(reference: &str) -> bool {
    ReferencePrefix::ALL.iter().any(|prefix| {
        reference
            .strip_prefix(prefix.as_str())
            .map_or(false, |rest| rest.len() > DATE_WIDTH && all_digits(rest))
    })
}

fn sequence_digits<'a>(day_prefix: &str, reference: &'a str) -> Option<&'a str> {
    reference
        .strip_prefix(day_prefix)
        .filter(|digits| all_digits(digits))
}

/// Extract the numeric sequence from a generated reference
pub fn parse_sequence(day_prefix: &str, reference: &str) -> Option<u64> {
    sequence_digits(day_prefix, reference)?.parse().ok()
}

/// Next reference for `date`, given the highest one already issued that day.
///
/// A sequence that no longer fits `u64` is an error rather than a restart, so
/// the generator never hands out a number that is already taken.
pub fn next_reference(
    prefix: ReferencePrefix,
    date: NaiveDate,
    last_same_day: Option<&str>,
) -> Result<String, ReferenceError> {
    let day_prefix = prefix.day_prefix(date);
    let sequence = match last_same_day.and_then(|last| sequence_digits(&day_prefix, last)) {
        None => 1,
        Some(digits) => digits
            .parse::<u64>()
            .ok()
            .and_then(|seq| seq.checked_add(1))
            .ok_or_else(|| ReferenceError::SequenceExhausted(day_prefix.clone()))?,
    };

    Ok(format!("{}{:0width$}", day_prefix, sequence, width = SEQUENCE_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn next(last: Option<&str>) -> Result<String, ReferenceError> {
        next_reference(ReferencePrefix::StockIn, day(), last)
    }

    #[test]
    fn test_first_reference_of_day() {
        assert_eq!(next(None).unwrap(), "IN202401150001");
        assert_eq!(
            next_reference(ReferencePrefix::StockOut, day(), None).unwrap(),
            "OUT202401150001"
        );
    }

    #[test]
    fn test_sequence_increments() {
        assert_eq!(next(Some("IN202401150041")).unwrap(), "IN202401150042");
    }

    #[test]
    fn test_sequence_grows_past_width() {
        assert_eq!(next(Some("IN202401159999")).unwrap(), "IN2024011510000");
    }

    #[test]
    fn test_sequence_grows_past_u32() {
        assert_eq!(next(Some("IN202401154294967295")).unwrap(), "IN202401154294967296");
        assert_eq!(next(Some("IN2024011599999999999")).unwrap(), "IN20240115100000000000");
    }

    #[test]
    fn test_exhausted_sequence_is_an_error() {
        let last = format!("IN20240115{}", u64::MAX);
        assert_eq!(
            next(Some(&last)),
            Err(ReferenceError::SequenceExhausted("IN20240115".to_string()))
        );
        assert!(next(Some("IN20240115999999999999999999999")).is_err());
    }

    #[test]
    fn test_foreign_reference_ignored() {
        // Different day or hand-entered suffix restarts the sequence
        assert_eq!(next(Some("IN20240114ABC")).unwrap(), "IN202401150001");
    }

    #[test]
    fn test_generated_shape() {
        assert!(is_generated_reference("IN202401150001"));
        assert!(is_generated_reference("OUT2024011512345"));
        assert!(!is_generated_reference("IN20240115"));
        assert!(!is_generated_reference("IN-20240115-1"));
        assert!(!is_generated_reference("PO202401150001"));
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("OUT20240115", "OUT202401150007"), Some(7));
        assert_eq!(parse_sequence("OUT20240115", "OUT20240115"), None);
        assert_eq!(parse_sequence("OUT20240115", "IN202401150007"), None);
    }
}
