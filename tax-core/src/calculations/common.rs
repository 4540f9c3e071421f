//! Rounding and clamping helpers shared by the calculators.
//!
//! The engine never rounds intermediate values. These helpers are applied
//! once, when a result is turned into something a person reads.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places used for percentages such as the effective tax rate.
pub const RATE_DECIMALS: u32 = 2;

pub const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Largest amount the engine accepts for any single input field (10^20).
///
/// Anything above is treated as this value, which keeps every annualized
/// sum and product far inside the range of [`Decimal`].
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x6310_0000, 0x6BC7_5E2D, 5, false, 0);

/// Rounds `value` to `decimals` places, with midpoints rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(1234.5), 0), dec!(1235));
/// assert_eq!(round_half_up(dec!(29.025), 2), dec!(29.03));
/// assert_eq!(round_half_up(dec!(-0.5), 0), dec!(-1));
/// ```
pub fn round_half_up(
    value: Decimal,
    decimals: u32,
) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a percentage to [`RATE_DECIMALS`] places.
pub fn round_rate(value: Decimal) -> Decimal {
    round_half_up(value, RATE_DECIMALS)
}

/// Clamps negative values to zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-5)), dec!(0));
/// assert_eq!(non_negative(dec!(5)), dec!(5));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Clamps `value` into `0..=MAX_AMOUNT`.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::{MAX_AMOUNT, bounded_amount};
///
/// assert_eq!(bounded_amount(dec!(-5)), dec!(0));
/// assert_eq!(bounded_amount(Decimal::MAX), MAX_AMOUNT);
/// ```
pub fn bounded_amount(value: Decimal) -> Decimal {
    non_negative(value).min(MAX_AMOUNT)
}

/// Converts a monthly amount to an annual one, treating negatives as zero
/// and amounts above [`MAX_AMOUNT`] as [`MAX_AMOUNT`].
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::annualize;
///
/// assert_eq!(annualize(dec!(5000000)), dec!(60000000));
/// assert_eq!(annualize(dec!(-1)), dec!(0));
/// ```
pub fn annualize(monthly: Decimal) -> Decimal {
    bounded_amount(monthly) * MONTHS_PER_YEAR
}

/// `numerator / denominator × 100`, or zero when the denominator is not positive.
pub fn percentage_of(
    numerator: Decimal,
    denominator: Decimal,
) -> Decimal {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator / denominator * Decimal::ONE_HUNDRED
}
