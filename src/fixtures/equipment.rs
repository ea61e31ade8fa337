//! Equipment Fixtures

use decimal_percentage::Percentage;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::Deserialize;

use crate::{equipment::Equipment, fixtures::FixtureError};

/// Wrapper for equipment in YAML
#[derive(Debug, Deserialize)]
pub struct EquipmentFixtureSet {
    /// Map of equipment key -> equipment fixture
    pub equipment: FxHashMap<String, EquipmentFixture>,
}

/// Equipment Fixture
#[derive(Debug, Deserialize)]
pub struct EquipmentFixture {
    /// Display name
    pub name: String,

    /// Identity of the owning party
    pub owner: String,

    /// Base daily rate (e.g., "100.00 USD")
    pub daily_rate: String,

    /// Security deposit (e.g., "300.00 USD")
    pub deposit: String,
}

impl TryFrom<EquipmentFixture> for Equipment<'_> {
    type Error = FixtureError;

    fn try_from(fixture: EquipmentFixture) -> Result<Self, Self::Error> {
        let (rate_minor, rate_currency) = parse_price(&fixture.daily_rate)?;
        let (deposit_minor, deposit_currency) = parse_price(&fixture.deposit)?;

        if rate_currency != deposit_currency {
            return Err(FixtureError::CurrencyMismatch(
                rate_currency.iso_alpha_code.to_string(),
                deposit_currency.iso_alpha_code.to_string(),
            ));
        }

        Ok(Equipment {
            name: fixture.name,
            owner: fixture.owner,
            daily_rate: Money::from_minor(rate_minor, rate_currency),
            deposit: Money::from_minor(deposit_minor, deposit_currency),
        })
    }
}

/// Parse price string (e.g., "2.99 USD") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    }

    let amount = parts
        .first()
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let minor_units = amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency_code = parts
        .get(1)
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = match *currency_code {
        "GBP" => GBP,
        "USD" => USD,
        "EUR" => EUR,
        other => return Err(FixtureError::UnknownCurrency(other.to_string())),
    };

    Ok((minor_units, currency))
}

/// Parse percentage string (e.g., "5%" or "0.05") into a `Percentage`
///
/// Accepts two formats:
/// - Percentage format: "5%" for 5%
/// - Decimal format: "0.05" for 5%
///
/// # Errors
///
/// Returns an error if the string cannot be parsed or if the value is invalid.
pub fn parse_percentage(s: &str) -> Result<Percentage, FixtureError> {
    let trimmed = s.trim();

    if let Some(percent_str) = trimmed.strip_suffix('%') {
        let value = percent_str
            .trim()
            .parse::<f64>()
            .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value / 100.0))
    } else {
        let value = trimmed
            .parse::<f64>()
            .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value))
    }
}
