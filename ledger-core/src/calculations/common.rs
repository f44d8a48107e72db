//! Shared arithmetic for tax calculations.
//!
//! Amounts are whole currency units. Rates are exact decimals, so a split
//! never suffers from binary floating point error (`999 × 0.1` is exactly
//! `99.9`, which floors to `99`).

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Tax owed on `amount` at `rate`, rounded down to a whole unit.
///
/// `amount` must be non-negative; the result for negative input is not
/// meaningful.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use ledger_core::calculations::common::tax_on;
///
/// assert_eq!(tax_on(999, dec!(0.1)), 99);
/// assert_eq!(tax_on(50, dec!(0.005)), 0);
/// ```
pub fn tax_on(
    amount: i64,
    rate: Decimal,
) -> i64 {
    Decimal::from(amount)
        .checked_mul(rate)
        .map(|tax| tax.floor())
        .and_then(|tax| tax.to_i64())
        .unwrap_or(0)
}

/// Splits `amount` into `(tax, net)` where `tax + net == amount`.
pub fn split(
    amount: i64,
    rate: Decimal,
) -> (i64, i64) {
    let tax = tax_on(amount, rate);
    (tax, amount - tax)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn tax_on_floors_fractional_units() {
        assert_eq!(tax_on(999, dec!(0.1)), 99);
    }

    #[test]
    fn tax_on_exact_multiple() {
        assert_eq!(tax_on(50000, dec!(0.1)), 5000);
        assert_eq!(tax_on(100, dec!(0.01)), 1);
    }

    #[test]
    fn tax_on_below_one_unit_is_zero() {
        assert_eq!(tax_on(50, dec!(0.005)), 0);
        assert_eq!(tax_on(199, dec!(0.005)), 0);
        assert_eq!(tax_on(200, dec!(0.005)), 1);
    }

    #[test]
    fn tax_on_zero_amount_or_rate() {
        assert_eq!(tax_on(0, dec!(0.3)), 0);
        assert_eq!(tax_on(12345, dec!(0)), 0);
    }

    #[test]
    fn tax_on_full_rate_takes_everything() {
        assert_eq!(tax_on(777, dec!(1)), 777);
    }

    #[test]
    fn tax_on_rate_that_is_inexact_in_binary() {
        // 0.29 has no exact f64 representation; decimal math keeps it exact.
        assert_eq!(tax_on(100, dec!(0.29)), 29);
    }

    #[test]
    fn tax_on_large_amount() {
        assert_eq!(tax_on(i64::MAX, dec!(0.5)), i64::MAX / 2);
    }

    #[test]
    fn split_always_sums_to_amount() {
        let rates = [
            dec!(0),
            dec!(0.002),
            dec!(0.005),
            dec!(0.01),
            dec!(0.03),
            dec!(0.1),
            dec!(0.333),
            dec!(0.5),
            dec!(0.999),
            dec!(1),
        ];

        for amount in (0..2_000).chain([9_999, 50_000, 1_000_003]) {
            for rate in rates {
                let (tax, net) = split(amount, rate);
                assert_eq!(tax + net, amount, "amount {amount} rate {rate}");
                assert_eq!(tax, (Decimal::from(amount) * rate).floor().to_i64().unwrap());
                assert!(tax >= 0 && tax <= amount);
            }
        }
    }
}
