//! Stock register arithmetic
//!
//! A material's on-hand quantity is a single non-negative register with three
//! mutators: receive (add), issue (subtract with a floor check) and set (record
//! the delta against the counted value). Services evaluate these rules before
//! writing, and the database constraints enforce the same rules under
//! concurrent access.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest value a NUMERIC(15, 3) stock column holds: 999999999999.999
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 3);

/// Largest value a NUMERIC(15, 2) price column holds: 9999999999999.99
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

/// Largest value a NUMERIC(18, 2) total column holds: 9999999999999999.99
pub const MAX_TOTAL_PRICE: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// Decimal places stored for quantities
pub const QUANTITY_SCALE: u32 = 3;

/// Decimal places stored for prices
pub const PRICE_SCALE: u32 = 2;

/// Business-rule violations on the stock register
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Stock level cannot be negative")]
    NegativeTarget,

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Stock level would exceed the maximum of {}", MAX_QUANTITY)]
    StockLimitExceeded,

    #[error("Total price exceeds the maximum of {}", MAX_TOTAL_PRICE)]
    TotalPriceTooLarge,
}

/// One of the three ways the register may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "quantity", rename_all = "snake_case")]
pub enum StockMutation {
    /// Stock-in: add a positive quantity
    Receive(Decimal),
    /// Stock-out: subtract a positive quantity, never below zero
    Issue(Decimal),
    /// Adjustment: replace the register with a counted value
    Set(Decimal),
}

/// Result of applying a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub before: Decimal,
    pub after: Decimal,
    /// `after - before`, signed
    pub difference: Decimal,
}

impl StockMutation {
    pub fn apply(self, current: Decimal) -> Result<StockChange, StockError> {
        let after = match self {
            StockMutation::Receive(quantity) => {
                ensure_positive(quantity)?;
                current
                    .checked_add(quantity)
                    .filter(|after| *after <= MAX_QUANTITY)
                    .ok_or(StockError::StockLimitExceeded)?
            }
            StockMutation::Issue(quantity) => {
                ensure_positive(quantity)?;
                if current < quantity {
                    return Err(StockError::InsufficientStock {
                        available: current,
                        requested: quantity,
                    });
                }
                current - quantity
            }
            StockMutation::Set(target) => {
                if target < Decimal::ZERO {
                    return Err(StockError::NegativeTarget);
                }
                if target > MAX_QUANTITY {
                    return Err(StockError::StockLimitExceeded);
                }
                target
            }
        };

        let difference = after
            .checked_sub(current)
            .ok_or(StockError::StockLimitExceeded)?;

        Ok(StockChange {
            before: current,
            after,
            difference,
        })
    }

    /// Compensating mutation for a recorded signed difference.
    ///
    /// Returns `None` for a zero difference. A positive difference is taken back
    /// out with the floor check, a negative one is added back.
    pub fn compensating(difference: Decimal) -> Option<StockMutation> {
        if difference > Decimal::ZERO {
            Some(StockMutation::Issue(difference))
        } else if difference < Decimal::ZERO {
            Some(StockMutation::Receive(-difference))
        } else {
            None
        }
    }
}

fn ensure_positive(quantity: Decimal) -> Result<(), StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::NonPositiveQuantity);
    }
    Ok(())
}

/// Plan an adjustment from the locked `old_stock` to the counted `new_stock`
pub fn plan_adjustment(old_stock: Decimal, new_stock: Decimal) -> Result<StockChange, StockError> {
    StockMutation::Set(new_stock).apply(old_stock)
}

/// Undo a stock mutation whose recorded signed effect was `difference`.
///
/// A zero difference leaves the register untouched.
pub fn reverse(current: Decimal, difference: Decimal) -> Result<StockChange, StockError> {
    match StockMutation::compensating(difference) {
        Some(mutation) => mutation.apply(current),
        None => Ok(StockChange {
            before: current,
            after: current,
            difference: Decimal::ZERO,
        }),
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total for a receipt, rounded to cents the way NUMERIC(…, 2) rounds
pub fn total_price(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, StockError> {
    quantity
        .checked_mul(unit_price)
        .map(round_cents)
        .filter(|total| total.abs() <= MAX_TOTAL_PRICE)
        .ok_or(StockError::TotalPriceTooLarge)
}

/// Stock value of a material at its unit price, for display
pub fn stock_value(current_stock: Decimal, unit_price: Decimal) -> Decimal {
    round_cents(current_stock.saturating_mul(unit_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_receive_adds() {
        let change = StockMutation::Receive(dec("20")).apply(dec("50")).unwrap();
        assert_eq!(change.after, dec("70"));
        assert_eq!(change.difference, dec("20"));
    }

    #[test]
    fn test_issue_rejects_overdraw() {
        let err = StockMutation::Issue(dec("15")).apply(dec("10")).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                available: dec("10"),
                requested: dec("15"),
            }
        );
    }

    #[test]
    fn test_issue_to_exactly_zero() {
        let change = StockMutation::Issue(dec("10")).apply(dec("10")).unwrap();
        assert_eq!(change.after, Decimal::ZERO);
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        assert_eq!(
            StockMutation::Receive(Decimal::ZERO).apply(dec("1")),
            Err(StockError::NonPositiveQuantity)
        );
        assert_eq!(
            StockMutation::Issue(dec("-1")).apply(dec("5")),
            Err(StockError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_set_records_signed_difference() {
        let change = plan_adjustment(dec("40"), dec("35")).unwrap();
        assert_eq!(change.difference, dec("-5"));
        assert_eq!(change.after, dec("35"));

        assert_eq!(plan_adjustment(dec("1"), dec("-1")), Err(StockError::NegativeTarget));
    }

    #[test]
    fn test_reverse_zero_difference_is_noop() {
        let change = reverse(dec("12"), Decimal::ZERO).unwrap();
        assert_eq!(change.after, dec("12"));
    }

    #[test]
    fn test_total_price_rounding() {
        assert_eq!(total_price(dec("20"), dec("10")), Ok(dec("200")));
        assert_eq!(total_price(dec("1.005"), dec("1")), Ok(dec("1.01")));
        assert_eq!(total_price(dec("0.125"), dec("0.10")), Ok(dec("0.01")));
    }

    #[test]
    fn test_column_limits() {
        assert_eq!(MAX_QUANTITY, dec("999999999999.999"));
        assert_eq!(MAX_UNIT_PRICE, dec("9999999999999.99"));
        assert_eq!(MAX_TOTAL_PRICE, dec("9999999999999999.99"));
    }

    #[test]
    fn test_total_price_overflow_is_an_error() {
        assert_eq!(
            total_price(dec("100000000000000000000"), dec("10000000000")),
            Err(StockError::TotalPriceTooLarge)
        );
        assert_eq!(
            total_price(Decimal::MAX, dec("2")),
            Err(StockError::TotalPriceTooLarge)
        );
        assert_eq!(total_price(MAX_QUANTITY, dec("10000")), Ok(dec("9999999999999990")));
    }

    #[test]
    fn test_receive_past_limit_is_an_error() {
        assert_eq!(
            StockMutation::Receive(Decimal::MAX).apply(Decimal::ONE),
            Err(StockError::StockLimitExceeded)
        );
        assert_eq!(
            StockMutation::Receive(dec("0.001")).apply(MAX_QUANTITY),
            Err(StockError::StockLimitExceeded)
        );
        assert_eq!(
            plan_adjustment(Decimal::ZERO, dec("1000000000000")),
            Err(StockError::StockLimitExceeded)
        );
        let full = StockMutation::Receive(dec("0.001"))
            .apply(MAX_QUANTITY - dec("0.001"))
            .unwrap();
        assert_eq!(full.after, MAX_QUANTITY);
    }

    #[test]
    fn test_stock_value_saturates() {
        assert_eq!(stock_value(dec("2"), dec("1.25")), dec("2.50"));
        assert_eq!(stock_value(Decimal::MAX, dec("2")), Decimal::MAX);
    }

    proptest! {
        #[test]
        fn prop_reverse_restores_register(
            current in 0i64..1_000_000,
            quantity in 1i64..1_000_000,
        ) {
            let current = Decimal::new(current, 3);
            let quantity = Decimal::new(quantity, 3);

            let received = StockMutation::Receive(quantity).apply(current).unwrap();
            let undone = reverse(received.after, received.difference).unwrap();
            prop_assert_eq!(undone.after, current);
        }

        #[test]
        fn prop_register_never_negative(
            current in 0i64..1_000_000,
            quantity in 1i64..2_000_000,
        ) {
            let current = Decimal::new(current, 3);
            let quantity = Decimal::new(quantity, 3);

            match StockMutation::Issue(quantity).apply(current) {
                Ok(change) => prop_assert!(change.after >= Decimal::ZERO),
                Err(StockError::InsufficientStock { .. }) => prop_assert!(current < quantity),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
