//! Stock register tests
//!
//! Property-based and scenario tests for the stock arithmetic shared by
//! receipts, issues and adjustments:
//! - The register never goes negative
//! - Reversing a mutation restores the previous level
//! - Stock status classification follows the thresholds

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{plan_adjustment, reverse, StockError, StockMutation, StockStatus};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Quantities with up to three decimal places, as stored in NUMERIC(15, 3)
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|n| Decimal::new(n, 3))
}

fn stock_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|n| Decimal::new(n, 3))
}

fn mutation_strategy() -> impl Strategy<Value = StockMutation> {
    prop_oneof![
        quantity_strategy().prop_map(StockMutation::Receive),
        quantity_strategy().prop_map(StockMutation::Issue),
        stock_strategy().prop_map(StockMutation::Set),
    ]
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Whatever sequence of mutations is attempted, accepted ones keep the
    /// register at or above zero and the running total equals the sum of
    /// recorded differences.
    #[test]
    fn test_register_never_negative(
        start in stock_strategy(),
        mutations in prop::collection::vec(mutation_strategy(), 1..40),
    ) {
        let mut current = start;
        let mut recorded = Decimal::ZERO;

        for mutation in mutations {
            match mutation.apply(current) {
                Ok(change) => {
                    prop_assert_eq!(change.before, current);
                    prop_assert!(change.after >= Decimal::ZERO);
                    recorded += change.difference;
                    current = change.after;
                }
                Err(StockError::InsufficientStock { available, requested }) => {
                    prop_assert_eq!(available, current);
                    prop_assert!(requested > current);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        prop_assert_eq!(start + recorded, current);
    }

    /// Deleting the most recent mutation puts the register back where it was
    #[test]
    fn test_reverse_latest_restores_previous(
        start in stock_strategy(),
        mutation in mutation_strategy(),
    ) {
        if let Ok(change) = mutation.apply(start) {
            let undone = reverse(change.after, change.difference).unwrap();
            prop_assert_eq!(undone.after, start);
        }
    }

    /// Issuing exactly the available amount always succeeds and empties the register
    #[test]
    fn test_issue_everything(stock in quantity_strategy()) {
        let change = StockMutation::Issue(stock).apply(stock).unwrap();
        prop_assert_eq!(change.after, Decimal::ZERO);
        prop_assert_eq!(
            StockStatus::classify(change.after, Decimal::ZERO, Decimal::ZERO),
            StockStatus::Empty
        );
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// Receive 20 on 50, issue 30, count 35
    #[test]
    fn test_receive_issue_count_sequence() {
        let received = StockMutation::Receive(dec("20")).apply(dec("50")).unwrap();
        assert_eq!(received.after, dec("70"));

        let issued = StockMutation::Issue(dec("30")).apply(received.after).unwrap();
        assert_eq!(issued.after, dec("40"));

        let counted = plan_adjustment(issued.after, dec("35")).unwrap();
        assert_eq!(counted.after, dec("35"));
        assert_eq!(counted.difference, dec("-5"));
    }

    #[test]
    fn test_overdraw_rejected_with_available_amount() {
        let err = StockMutation::Issue(dec("15")).apply(dec("10")).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                available: dec("10"),
                requested: dec("15"),
            }
        );
    }

    /// Removing an old receipt after the stock was consumed must not go negative
    #[test]
    fn test_reversal_blocked_when_stock_consumed() {
        // receipt of 20 on 0, then 15 issued: 5 left
        let err = reverse(dec("5"), dec("20")).unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { .. }));
    }

    #[test]
    fn test_reversing_issue_adds_back() {
        let change = reverse(dec("40"), dec("-30")).unwrap();
        assert_eq!(change.after, dec("70"));
    }

    #[test]
    fn test_adjustment_to_negative_rejected() {
        assert_eq!(
            plan_adjustment(dec("10"), dec("-1")).unwrap_err(),
            StockError::NegativeTarget
        );
    }

    #[test]
    fn test_stock_status_thresholds() {
        let min = dec("10");
        let reorder = dec("20");
        assert_eq!(StockStatus::classify(dec("0"), min, reorder), StockStatus::Empty);
        assert_eq!(StockStatus::classify(dec("10"), min, reorder), StockStatus::Low);
        assert_eq!(StockStatus::classify(dec("20"), min, reorder), StockStatus::Warning);
        assert_eq!(StockStatus::classify(dec("20.001"), min, reorder), StockStatus::Normal);
    }
}
