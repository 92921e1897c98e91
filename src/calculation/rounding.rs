//! Money rounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a money amount to `scale` decimal places, half away from zero.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("10.125").unwrap(), 2), Decimal::from_str("10.13").unwrap());
/// assert_eq!(round_money(Decimal::from_str("-10.125").unwrap(), 2), Decimal::from_str("-10.13").unwrap());
/// ```
pub fn round_money(amount: Decimal, scale: u32) -> Decimal {
    amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}
