//! Pricing

use decimal_percentage::Percentage;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rustc_hash::FxHashMap;
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::{availability::AvailabilitySlot, calendar::DateRange};

/// Errors that can occur while quoting a rental.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// The base daily rate is zero or negative.
    #[error("daily rate must be positive, got {0} minor units")]
    NonPositiveRate(i64),

    /// Fee calculation overflowed or could not be represented.
    #[error("fee conversion overflowed or was not finite")]
    FeeConversion,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A priced rental: per-day subtotal, marketplace fee and total.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote<'a> {
    days: i64,
    subtotal: Money<'a, Currency>,
    fees: Money<'a, Currency>,
    total: Money<'a, Currency>,
}

impl<'a> Quote<'a> {
    /// Number of rental days priced.
    #[must_use]
    pub fn days(&self) -> i64 {
        self.days
    }

    /// Sum of the per-day rates before fees.
    #[must_use]
    pub fn subtotal(&self) -> &Money<'a, Currency> {
        &self.subtotal
    }

    /// Marketplace fee on the subtotal.
    #[must_use]
    pub fn fees(&self) -> &Money<'a, Currency> {
        &self.fees
    }

    /// Subtotal plus fees.
    #[must_use]
    pub fn total(&self) -> &Money<'a, Currency> {
        &self.total
    }
}

/// Prices a rental over `range` at `daily_rate`, applying the marketplace
/// `fee_rate` to the subtotal.
///
/// The subtotal is a **day-by-day** sum: a day carrying an
/// [`AvailabilitySlot::custom_rate`] override contributes the override
/// instead of the base rate. Uniform multiplication would only be correct
/// with no overrides in range, so it is not used.
///
/// Side-effect-free; range validity (`start < end`) is enforced by
/// [`DateRange`] upstream.
///
/// # Errors
///
/// - [`PricingError::NonPositiveRate`]: `daily_rate`, or an override rate
///   used by a day in range, is zero or negative.
/// - [`PricingError::FeeConversion`]: the fee could not be represented.
/// - [`PricingError::Money`]: money arithmetic failed (currency mismatch).
pub fn quote<'a>(
    daily_rate: &Money<'a, Currency>,
    range: &DateRange,
    fee_rate: Percentage,
    overrides: &[AvailabilitySlot<'a>],
) -> Result<Quote<'a>, PricingError> {
    let rate_minor = daily_rate.to_minor_units();

    if rate_minor <= 0 {
        return Err(PricingError::NonPositiveRate(rate_minor));
    }

    let currency = daily_rate.currency();

    let day_rates: FxHashMap<_, _> = overrides
        .iter()
        .filter_map(|slot| slot.custom_rate.as_ref().map(|rate| (slot.date, rate)))
        .collect();

    let subtotal = range
        .iter_days()
        .try_fold(Money::from_minor(0, currency), |acc, day| {
            let rate = day_rates.get(&day).copied().unwrap_or(daily_rate);
            let day_minor = rate.to_minor_units();

            // Override rates face the same floor as the base rate.
            if day_minor <= 0 {
                return Err(PricingError::NonPositiveRate(day_minor));
            }

            Ok(acc.add(*rate)?)
        })?;

    let fee_minor = fee_on_minor(fee_rate, subtotal.to_minor_units())?;
    let fees = Money::from_minor(fee_minor, currency);
    let total = subtotal.add(fees)?;

    Ok(Quote {
        days: range.days(),
        subtotal,
        fees,
        total,
    })
}

/// Applies a fractional fee rate to a minor-unit amount, rounding half away
/// from zero.
fn fee_on_minor(fee_rate: Percentage, minor: i64) -> Result<i64, PricingError> {
    let Some(minor) = Decimal::from_i64(minor) else {
        unreachable!("always returns `Some` for every `i64`")
    };

    let applied = fee_rate * minor;

    let rounded = applied.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    rounded.to_i64().ok_or(PricingError::FeeConversion)
}
