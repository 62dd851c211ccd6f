//! Decimal helpers for monetary values.
//!
//! Amounts are kept as exact decimals with two fractional digits so repeated
//! partial payments never accumulate rounding drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept for every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Whole units in the largest amount a single record may carry.
pub const MAX_WHOLE_UNITS: i64 = 1_000_000_000_000_000;

/// Upper bound on the magnitude of any stored amount.
pub fn max_amount() -> Decimal {
    Decimal::from(MAX_WHOLE_UNITS)
}

/// Rounds an amount to the stored scale (half away from zero).
pub fn normalize(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds an amount from integer minor units, e.g. `cents(40000)` is `400.00`.
pub fn cents(minor_units: i64) -> Decimal {
    Decimal::new(minor_units, MONEY_SCALE)
}

/// Sums amounts, returning zero for an empty iterator. Saturates at the
/// decimal range instead of overflowing.
pub fn sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |acc, value| acc.saturating_add(value))
}

/// Sums amounts, or `None` when the total leaves the decimal range.
pub fn checked_sum<I>(amounts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rounds_half_away_from_zero() {
        assert_eq!(normalize(Decimal::new(10005, 3)), cents(1001));
        assert_eq!(normalize(Decimal::new(-10005, 3)), cents(-1001));
    }

    #[test]
    fn thirds_do_not_drift() {
        let third = normalize(cents(100_000) / Decimal::from(3));
        let paid = sum([third, third]);
        let remainder = cents(100_000) - paid;
        assert_eq!(paid + remainder, cents(100_000));
        assert_eq!(remainder, cents(33_334));
    }

    #[test]
    fn sums_near_the_decimal_limit_do_not_panic() {
        let huge = [Decimal::MAX, Decimal::MAX];
        assert_eq!(sum(huge), Decimal::MAX);
        assert_eq!(checked_sum(huge), None);
        assert_eq!(checked_sum([cents(150), cents(250)]), Some(cents(400)));
    }
}
